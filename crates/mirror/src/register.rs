use crate::error::{ErrorKind, Result};
use crate::mirror::Mirror;
use cdnget_model::UpstreamService;
use exn::ResultExt;
use tracing::instrument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    Created,
    /// Priority or description changed.
    Updated,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct Registered {
    /// The stored service, whose id keys everything mirrored for it.
    pub service: UpstreamService,
    pub registration: Registration,
}

impl Mirror {
    /// Make the stored services match their configuration.
    ///
    /// Missing services are created. Existing ones (matched by name) only
    /// take the configured priority and description: the directory name is
    /// fixed once content may have been written under it. Any failure is
    /// fatal, before reconciliation starts.
    #[instrument(skip_all)]
    pub async fn register_services(
        &self,
        services: impl IntoIterator<Item = UpstreamService>,
    ) -> Result<Vec<Registered>> {
        let mut registered = Vec::new();
        for configured in services {
            let name = configured.name.clone();
            let stored = self.repo.get_service_by_name(&name).await.or_raise(|| ErrorKind::Cache)?;
            let (service, registration) = match stored {
                None => {
                    self.repo.create_service(&configured).await.or_raise(|| ErrorKind::Registration(name.clone()))?;
                    (configured, Registration::Created)
                },
                Some(mut stored) => {
                    if !stored.dir_name.eq_ignore_ascii_case(&configured.dir_name) {
                        tracing::warn!(
                            service = %stored.name,
                            stored = %stored.dir_name,
                            configured = %configured.dir_name,
                            "directory name cannot change; keeping the stored one"
                        );
                    }
                    if stored.update(configured.priority, &configured.description) {
                        self.repo.update_service(&stored).await.or_raise(|| ErrorKind::Registration(name.clone()))?;
                        (stored, Registration::Updated)
                    } else {
                        (stored, Registration::Unchanged)
                    }
                },
            };
            tracing::debug!(service = %service.name, ?registration, "registered service");
            registered.push(Registered { service, registration });
        }
        Ok(registered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::fixtures::harness;

    fn cdnjs(priority: u16) -> UpstreamService {
        UpstreamService::new("cdnjs", "cdnjs").unwrap().with_priority(priority).with_description("cdnjs.com")
    }

    #[tokio::test]
    async fn test_register_create_update_unchanged() {
        let h = harness().await;
        let created = h.mirror.register_services([cdnjs(1)]).await.unwrap();
        assert_eq!(created[0].registration, Registration::Created);

        let updated = h.mirror.register_services([cdnjs(5)]).await.unwrap();
        assert_eq!(updated[0].registration, Registration::Updated);
        // Existing rows keep their id.
        assert_eq!(updated[0].service.id, created[0].service.id);
        assert_eq!(h.store.get_service(created[0].service.id).await.unwrap().unwrap().priority, 5);

        let unchanged = h.mirror.register_services([cdnjs(5)]).await.unwrap();
        assert_eq!(unchanged[0].registration, Registration::Unchanged);
    }

    #[tokio::test]
    async fn test_dir_name_is_kept() {
        let h = harness().await;
        h.mirror.register_services([cdnjs(1)]).await.unwrap();
        let moved = UpstreamService::new("cdnjs", "elsewhere").unwrap().with_priority(1).with_description("cdnjs.com");
        let registered = h.mirror.register_services([moved]).await.unwrap();
        assert_eq!(registered[0].service.dir_name, "cdnjs");
        assert_eq!(registered[0].registration, Registration::Unchanged);
    }

    #[tokio::test]
    async fn test_conflicting_dir_name_is_fatal() {
        let h = harness().await;
        h.mirror.register_services([cdnjs(1)]).await.unwrap();
        let clash = UpstreamService::new("cdnjs-mirror", "CDNJS").unwrap();
        let err = h.mirror.register_services([clash]).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Registration(name) if name == "cdnjs-mirror"));
    }
}
