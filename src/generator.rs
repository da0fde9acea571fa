//! Seeded synthetic link graphs for benchmarks and tests.

use std::collections::BTreeSet;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::Result;
use crate::ingest::LinkDocument;

/// Builds reproducible link graphs with planted cliques.
///
/// Every vertex gets a random number of outgoing links (`0..2 * avg_links`),
/// each reciprocated with probability `mutual_ratio`. Planted cliques are
/// disjoint groups whose members all link to each other, so the largest
/// cliques of the output are known in advance.
pub struct LinkGraphGenerator {
    rng: ChaCha8Rng,
}

/// Shape of a generated graph.
#[derive(Clone, Debug)]
pub struct GraphShape {
    /// Number of vertices, labelled `page-<n>`.
    pub vertices: usize,
    /// Mean outgoing links per vertex.
    pub avg_links: usize,
    /// Chance that a random link is reciprocated.
    pub mutual_ratio: f64,
    /// Sizes of the fully linked groups to plant.
    pub planted: Vec<usize>,
}

impl Default for GraphShape {
    fn default() -> Self {
        Self {
            vertices: 1_000,
            avg_links: 8,
            mutual_ratio: 0.3,
            planted: vec![12, 10, 8],
        }
    }
}

impl LinkGraphGenerator {
    /// Creates a generator with a fixed seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Label used for vertex `index`.
    pub fn label(index: usize) -> String {
        format!("page-{index}")
    }

    /// Generates one document per vertex, ordered by vertex index.
    pub fn generate(&mut self, shape: &GraphShape) -> Vec<LinkDocument> {
        let n = shape.vertices;
        let mut links: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); n];
        if n > 1 && shape.avg_links > 0 {
            for source in 0..n {
                let count = self.rng.gen_range(0..shape.avg_links * 2);
                for _ in 0..count {
                    let target = self.rng.gen_range(0..n);
                    if target == source {
                        continue;
                    }
                    links[source].insert(target);
                    if self.rng.gen_bool(shape.mutual_ratio.clamp(0.0, 1.0)) {
                        links[target].insert(source);
                    }
                }
            }
        }

        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(&mut self.rng);
        let mut cursor = 0;
        for &size in &shape.planted {
            let Some(group) = order.get(cursor..cursor + size) else {
                break;
            };
            cursor += size;
            for &a in group {
                for &b in group {
                    if a != b {
                        links[a].insert(b);
                    }
                }
            }
        }

        links
            .into_iter()
            .enumerate()
            .map(|(source, targets)| LinkDocument {
                source: Self::label(source),
                targets: targets.into_iter().map(Self::label).collect(),
            })
            .collect()
    }

    /// Writes `docs` as a `source,target` CSV file with a header row.
    pub fn write_csv(path: impl AsRef<Path>, docs: &[LinkDocument]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["source", "target"])?;
        for doc in docs {
            if doc.targets.is_empty() {
                writer.write_record([doc.source.as_str(), ""])?;
            }
            for target in &doc.targets {
                writer.write_record([doc.source.as_str(), target.as_str()])?;
            }
        }
        writer.flush()?;
        Ok(())
    }
}
