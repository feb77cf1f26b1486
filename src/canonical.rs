use seo_types::seo_url::{GeneratedSeoUrl, NewSeoUrl, SeoUrl, SeoUrlChanges};
use seo_types::without_leading_slash;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Existing canonical rows of one `(sales channel, route)`, keyed by foreign key.
#[derive(Debug, Default)]
pub struct CanonicalIndex {
    latest: HashMap<Uuid, SeoUrl>,
    stale: HashMap<Uuid, Vec<Uuid>>,
}

impl CanonicalIndex {
    pub fn get(&self, foreign_key: &Uuid) -> Option<&SeoUrl> {
        self.latest.get(foreign_key)
    }

    /// Older canonical rows of the same foreign key, left behind by racing passes.
    pub fn stale(&self, foreign_key: &Uuid) -> &[Uuid] {
        self.stale
            .get(foreign_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}

impl FromIterator<SeoUrl> for CanonicalIndex {
    fn from_iter<T: IntoIterator<Item = SeoUrl>>(iter: T) -> Self {
        let mut index = CanonicalIndex::default();
        for url in iter {
            let fk = url.foreign_key;
            let older = match index.latest.remove(&fk) {
                Some(existing) if existing.auto_increment > url.auto_increment => {
                    index.latest.insert(fk, existing);
                    url.id
                }
                Some(existing) => {
                    index.latest.insert(fk, url);
                    existing.id
                }
                None => {
                    index.latest.insert(fk, url);
                    continue;
                }
            };
            index.stale.entry(fk).or_default().push(older);
        }
        index
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileStats {
    pub unchanged: usize,
    pub skipped_modified: usize,
}

#[derive(Debug)]
pub struct ReconcilePlan {
    pub changes: SeoUrlChanges,
    pub stats: ReconcileStats,
}

/// Decides which generated urls are written for one `(sales channel, route)`.
///
/// `foreign_keys` together with the keys of `seo_urls` is the complete set of
/// entities that currently qualify for the route, `live_foreign_keys` the
/// entities that still own non-deleted rows.
pub fn plan(
    sales_channel_id: Uuid,
    route_name: &str,
    foreign_keys: &[Uuid],
    live_foreign_keys: &HashSet<Uuid>,
    index: &CanonicalIndex,
    seo_urls: impl IntoIterator<Item = GeneratedSeoUrl>,
) -> ReconcilePlan {
    // last tuple per foreign key wins, first occurrence keeps its position
    let mut order = vec![];
    let mut latest: HashMap<Uuid, GeneratedSeoUrl> = HashMap::new();
    for url in seo_urls {
        if latest.insert(url.foreign_key, url.clone()).is_none() {
            order.push(url.foreign_key);
        }
    }

    let mut changes = SeoUrlChanges {
        sales_channel_id,
        route_name: route_name.to_string(),
        ..Default::default()
    };
    let mut stats = ReconcileStats::default();

    for fk in &order {
        let Some(url) = latest.remove(fk) else {
            continue;
        };
        changes.obsoleted.extend_from_slice(index.stale(fk));
        if let Some(existing) = index.get(fk) {
            if existing.is_deleted {
                changes.restored.push(existing.id);
            }
            if existing.is_modified {
                stats.skipped_modified += 1;
                continue;
            }
            if existing.seo_path_info == without_leading_slash(&url.seo_path_info) {
                stats.unchanged += 1;
                continue;
            }
            changes.obsoleted.push(existing.id);
        }
        changes
            .inserts
            .push(NewSeoUrl::from_generated(sales_channel_id, route_name, url));
    }

    // a generated url keeps its entity alive even when the key set omits it
    let generated: HashSet<&Uuid> = order.iter().collect();
    let requested: HashSet<&Uuid> = foreign_keys.iter().chain(order.iter()).collect();
    let mut deleted: Vec<Uuid> = foreign_keys
        .iter()
        .filter(|fk| !generated.contains(fk))
        .chain(live_foreign_keys.iter().filter(|fk| !requested.contains(fk)))
        .copied()
        .collect();
    deleted.sort();
    deleted.dedup();
    changes.deleted_foreign_keys = deleted;

    ReconcilePlan { changes, stats }
}
