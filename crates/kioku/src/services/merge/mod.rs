//! Merge Strategy - combines redundant memories and applies updates
//!
//! - [`RuleMemoryMerger`]: type-aware content combination
//! - [`LlmMemoryMerger`]: model-synthesized content on top of the same
//!   bookkeeping

mod llm;
mod rules;

pub use llm::*;
pub use rules::*;

use async_trait::async_trait;
use futures::future::join_all;

use crate::domain::{DomainError, MemoryContext, MemoryRecord};
use crate::services::fallback::{try_primary, WithFallback};
use crate::services::text::jaccard;

/// Merge strategy
#[async_trait]
pub trait MemoryMerger: Send + Sync {
    /// Merge records into one new consolidated record.
    /// A single record is returned as a clone; no records is an error.
    async fn merge(&self, records: &[MemoryRecord]) -> Result<MemoryRecord, DomainError>;

    /// Apply new content to a record, replacing or appending
    async fn update(
        &self,
        record: &MemoryRecord,
        new_content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryRecord, DomainError>;

    /// Merge every group of near-duplicates, passing singletons through.
    ///
    /// Groups are connected components of pairwise word overlap at or above
    /// `threshold`, within one user, over non-deprecated records. Deprecated
    /// records pass through untouched.
    async fn consolidate(
        &self,
        records: &[MemoryRecord],
        threshold: f64,
    ) -> Result<Vec<MemoryRecord>, DomainError> {
        let groups = similarity_groups(records, threshold);
        let merged = join_all(groups.iter().map(|group| async move {
            if group.len() == 1 {
                Ok(records[group[0]].clone())
            } else {
                let members: Vec<MemoryRecord> =
                    group.iter().map(|&i| records[i].clone()).collect();
                self.merge(&members).await
            }
        }))
        .await
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?;

        let merged_groups = groups.iter().filter(|g| g.len() > 1).count();
        if merged_groups > 0 {
            tracing::info!(
                input = records.len(),
                output = merged.len(),
                merged_groups,
                "🧩 Consolidation completed"
            );
        }
        Ok(merged)
    }
}

/// Partition record indices into similarity groups, in first-member order
pub fn similarity_groups(records: &[MemoryRecord], threshold: f64) -> Vec<Vec<usize>> {
    let mut parent: Vec<usize> = (0..records.len()).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    for i in 0..records.len() {
        if records[i].is_deprecated() {
            continue;
        }
        for j in (i + 1)..records.len() {
            if records[j].is_deprecated() || records[i].user_id != records[j].user_id {
                continue;
            }
            if jaccard(records[i].content(), records[j].content()) >= threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // keep the lower index as root so groups order by first member
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut root_slot: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
    for i in 0..records.len() {
        let root = find(&mut parent, i);
        match root_slot.get(&root) {
            Some(&slot) => groups[slot].push(i),
            None => {
                root_slot.insert(root, groups.len());
                groups.push(vec![i]);
            }
        }
    }
    groups
}

#[async_trait]
impl<P, F> MemoryMerger for WithFallback<P, F>
where
    P: MemoryMerger,
    F: MemoryMerger,
{
    async fn merge(&self, records: &[MemoryRecord]) -> Result<MemoryRecord, DomainError> {
        if records.is_empty() {
            return Err(DomainError::Validation("nothing to merge".to_string()));
        }
        try_primary!(
            "merger",
            self.primary().merge(records),
            self.fallback().merge(records)
        )
    }

    async fn update(
        &self,
        record: &MemoryRecord,
        new_content: &str,
        context: &MemoryContext,
    ) -> Result<MemoryRecord, DomainError> {
        try_primary!(
            "merger",
            self.primary().update(record, new_content, context),
            self.fallback().update(record, new_content, context)
        )
    }
}
