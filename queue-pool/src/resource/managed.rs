use std::fmt::{self, Debug, Formatter};
use std::time::Instant;

use super::{Health, RepairPoint, Resource, ResourceInfo};

/// A pooled slot: a [`Resource`] together with its live handle (while open)
/// and the timestamps and counters used by the recycling policy.
///
/// Pools never create or destroy managed resources, they only open and close
/// the handle held inside. Construct one per slot and hand it to
/// [`Pool::populate`](crate::Pool::populate).
pub struct ManagedResource<R: Resource> {
    name: String,
    resource: R,
    handle: Option<R::Handle>,
    info: ResourceInfo,
}

impl<R: Resource> ManagedResource<R> {
    /// Create a closed managed resource.
    pub fn new(name: impl Into<String>, resource: R) -> Self {
        Self {
            name: name.into(),
            resource,
            handle: None,
            info: ResourceInfo::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn info(&self) -> &ResourceInfo {
        &self.info
    }

    pub fn handle(&self) -> Option<&R::Handle> {
        self.handle.as_ref()
    }

    pub fn handle_mut(&mut self) -> Option<&mut R::Handle> {
        self.handle.as_mut()
    }

    pub fn resource(&self) -> &R {
        &self.resource
    }

    pub fn resource_mut(&mut self) -> &mut R {
        &mut self.resource
    }

    /// Open a new handle, closing any handle currently held.
    pub fn open(&mut self) -> Result<(), R::Error> {
        if self.is_open() {
            self.close();
        }
        let handle = self.resource.open()?;
        let now = Instant::now();
        self.handle.replace(handle);
        self.info.last_opened.replace(now);
        self.info.last_used.replace(now);
        self.info.usage_count = 0;
        tracing::debug!(resource = %self.name, "opened resource");
        Ok(())
    }

    /// Release the handle if one is held. A failure reported by the resource
    /// is logged, the handle is dropped either way.
    pub fn close(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Err(err) = self.resource.close(handle) {
                tracing::warn!(resource = %self.name, error = %err, "error closing resource");
            } else {
                tracing::debug!(resource = %self.name, "closed resource");
            }
        }
        self.info.last_opened.take();
        self.info.usage_count = 0;
    }

    /// Run the resource health check against an open handle, closing it if
    /// it is reported broken. Closed resources are reported as healthy.
    pub fn repair(&mut self, point: RepairPoint) -> Health {
        let health = match self.handle.as_mut() {
            Some(handle) => self.resource.repair(handle, point),
            None => return Health::Healthy,
        };
        match health {
            Health::Healthy => (),
            Health::Repaired => {
                tracing::debug!(resource = %self.name, %point, "repaired resource");
            }
            Health::Broken => {
                tracing::debug!(resource = %self.name, %point, "closing broken resource");
                self.close();
            }
        }
        health
    }

    pub(crate) fn touch(&mut self, now: Instant) {
        self.info.last_used.replace(now);
    }

    pub(crate) fn mark_taken(&mut self, now: Instant) {
        self.info.usage_count += 1;
        self.info.last_used.replace(now);
    }
}

impl<R: Resource + Debug> Debug for ManagedResource<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedResource")
            .field("name", &self.name)
            .field("resource", &self.resource)
            .field("is_open", &self.is_open())
            .field("info", &self.info)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::{self, Display, Formatter};

    #[derive(Debug)]
    struct Refused;

    impl Display for Refused {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "refused")
        }
    }

    impl std::error::Error for Refused {}

    #[derive(Debug, Default)]
    struct Numbered {
        next: u32,
        refuse: bool,
        health: Option<Health>,
    }

    impl Resource for Numbered {
        type Handle = u32;
        type Error = Refused;

        fn open(&mut self) -> Result<u32, Refused> {
            if self.refuse {
                return Err(Refused);
            }
            self.next += 1;
            Ok(self.next)
        }

        fn close(&mut self, _handle: u32) -> Result<(), Refused> {
            Ok(())
        }

        fn repair(&mut self, _handle: &mut u32, _point: RepairPoint) -> Health {
            self.health.unwrap_or(Health::Healthy)
        }
    }

    #[test]
    fn managed_open_close() {
        let mut res = ManagedResource::new("a", Numbered::default());
        assert!(!res.is_open());
        assert_eq!(res.info().last_opened, None);

        res.open().unwrap();
        assert!(res.is_open());
        assert_eq!(res.handle(), Some(&1));
        assert!(res.info().last_opened.is_some());
        assert_eq!(res.info().last_opened, res.info().last_used);

        res.mark_taken(Instant::now());
        assert_eq!(res.info().usage_count, 1);

        res.close();
        assert!(!res.is_open());
        assert_eq!(res.info().usage_count, 0);
        assert_eq!(res.info().last_opened, None);

        // closing twice is harmless
        res.close();
        assert!(!res.is_open());
    }

    #[test]
    fn managed_reopen_resets_usage() {
        let mut res = ManagedResource::new("a", Numbered::default());
        res.open().unwrap();
        res.mark_taken(Instant::now());
        res.mark_taken(Instant::now());
        res.open().unwrap();
        assert_eq!(res.handle(), Some(&2));
        assert_eq!(res.info().usage_count, 0);
    }

    #[test]
    fn managed_open_failure_stays_closed() {
        let mut res = ManagedResource::new(
            "a",
            Numbered {
                refuse: true,
                ..Default::default()
            },
        );
        assert!(res.open().is_err());
        assert!(!res.is_open());
        assert_eq!(res.info().last_opened, None);
    }

    #[test]
    fn managed_repair_broken_closes() {
        let mut res = ManagedResource::new("a", Numbered::default());
        // closed resources are not inspected
        res.resource_mut().health.replace(Health::Broken);
        assert_eq!(res.repair(RepairPoint::Take), Health::Healthy);

        res.open().unwrap();
        assert_eq!(res.repair(RepairPoint::Put), Health::Broken);
        assert!(!res.is_open());

        res.resource_mut().health.replace(Health::Repaired);
        res.open().unwrap();
        assert_eq!(res.repair(RepairPoint::Put), Health::Repaired);
        assert!(res.is_open());
    }
}
