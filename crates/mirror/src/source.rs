use cdnget_model::UpstreamService;
use cdnget_upstream::Upstream;

/// A registered service paired with the upstream that serves it.
///
/// The service must be the stored one: its id keys every row written for it.
#[derive(Clone)]
pub struct MirrorSource {
    pub service: UpstreamService,
    pub upstream: Upstream,
}
impl MirrorSource {
    pub fn new(service: UpstreamService, upstream: Upstream) -> Self {
        Self { service, upstream }
    }
}

/// Most authoritative first.
pub(crate) fn by_precedence(sources: &[MirrorSource]) -> Vec<&MirrorSource> {
    let mut ordered: Vec<&MirrorSource> = sources.iter().collect();
    ordered.sort_by(|a, b| a.service.cmp_precedence(&b.service));
    ordered
}
