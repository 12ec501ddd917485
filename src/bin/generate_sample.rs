use std::collections::BTreeMap;

use anyhow::{Context, Result};
use spot_export::data::loader::{FeatureListEntry, SourceDocument};
use spot_export::data::model::{Feature, FeatureIntensities, RegionNode, SpotSet};

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}

fn region(id: &str, name: &str, subregions: &[&str]) -> RegionNode {
    RegionNode {
        id: id.to_string(),
        name: name.to_string(),
        subregions: subregions.iter().map(|s| s.to_string()).collect(),
    }
}

/// A `w` × `h` grid of spots with ids starting at `first_id`.
fn grid(first_id: i64, x0: i64, y0: i64, w: i64, h: i64) -> SpotSet {
    let mut spots = SpotSet::default();
    for j in 0..h {
        for i in 0..w {
            spots.ids.push(first_id + j * w + i);
            spots.x.push(x0 + i);
            spots.y.push(y0 + j);
        }
    }
    spots
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    // Leaf regions: (id, spot grid). "empty" has no spots; the second "Cortex"
    // exercises the duplicate-name warning.
    let regions = vec![
        region("root", "Regions", &["kidney", "liver", "slide2"]),
        region("kidney", "Regions/Kidney", &["cortex", "medulla"]),
        region("cortex", "Regions/Kidney/Cortex", &[]),
        region("medulla", "Regions/Kidney/Medulla", &[]),
        region("liver", "Regions/Liver", &[]),
        region("slide2", "Regions/Slide 2", &["cortex2", "empty"]),
        region("cortex2", "Regions/Slide 2/Cortex", &[]),
        region("empty", "Regions/Slide 2/Unannotated", &[]),
    ];

    let mut spots = BTreeMap::new();
    spots.insert("cortex".to_string(), grid(1, 0, 0, 12, 8));
    spots.insert("medulla".to_string(), grid(1001, 0, 8, 12, 6));
    spots.insert("liver".to_string(), grid(2001, 20, 0, 10, 10));
    spots.insert("cortex2".to_string(), grid(3001, 0, 0, 8, 8));

    // (m/z, centre x, centre y, spread, amplitude)
    let peaks = [
        (760.585, 4.0, 4.0, 3.0, 120.0),
        (782.567, 10.0, 10.0, 4.0, 80.0),
        (806.567, 24.0, 5.0, 2.5, 200.0),
        (885.549, 6.0, 12.0, 5.0, 60.0),
    ];
    let features: Vec<Feature> = peaks
        .iter()
        .enumerate()
        .map(|(i, &(mz, ..))| Feature {
            id: format!("feat-{i}"),
            name: format!("{mz:.3}"),
        })
        .collect();

    let mut intensities: BTreeMap<String, BTreeMap<String, FeatureIntensities>> = BTreeMap::new();
    for (feature, &(_, cx, cy, spread, amp)) in features.iter().zip(peaks.iter()) {
        for (region_id, set) in &spots {
            let mut sparse = FeatureIntensities::default();
            for ((&id, &x), &y) in set.ids.iter().zip(&set.x).zip(&set.y) {
                let signal = gaussian(x as f64, cx, spread, 1.0) * gaussian(y as f64, cy, spread, amp);
                let value = signal + rng.next_f64();
                // Below detection threshold: not reported at all.
                if value < 1.0 {
                    continue;
                }
                sparse.spot_ids.push(id);
                sparse.values.push((value * 1000.0).round() / 1000.0);
            }
            intensities
                .entry(feature.id.clone())
                .or_default()
                .insert(region_id.clone(), sparse);
        }
    }

    let doc = SourceDocument {
        root: "root".to_string(),
        regions,
        feature_lists: vec![
            FeatureListEntry {
                id: "fl-lipids".to_string(),
                name: "Lipids".to_string(),
                num_features: None,
                features: features.clone(),
            },
            FeatureListEntry {
                id: "fl-top".to_string(),
                name: "Top peak".to_string(),
                num_features: None,
                features: features[..1].to_vec(),
            },
        ],
        spots,
        intensities,
    };

    let output_path = "sample_source.json";
    let file = std::fs::File::create(output_path).context("creating output file")?;
    serde_json::to_writer_pretty(file, &doc).context("writing sample document")?;

    let n_spots: usize = doc.spots.values().map(SpotSet::len).sum();
    println!(
        "Wrote {} regions, {} spots and {} features to {output_path}",
        doc.regions.len(),
        n_spots,
        features.len()
    );
    Ok(())
}
