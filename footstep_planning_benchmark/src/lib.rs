use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Axis-aligned horizontal patch of ground, one row of a terrain file.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct TerrainBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub z: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedOutcome {
    Solution,
    Infeasible,
}

/// Start and goal midpoints between the feet, with the yaw the robot faces.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Scenario {
    pub id: u32,
    pub terrain: String,
    pub start_x: f64,
    pub start_y: f64,
    pub start_yaw: f64,
    pub goal_x: f64,
    pub goal_y: f64,
    pub goal_yaw: f64,
    pub expected: ExpectedOutcome,
}

fn data_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).to_path_buf()
}

fn load_terrain(name: &str) -> Vec<TerrainBox> {
    let path = data_root().join("terrain").join(format!("{}.csv", name));
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(&path)
        .expect("Could not open terrain file");
    csv_reader
        .deserialize()
        .map(|result| result.expect("Could not parse terrain record"))
        .collect()
}

fn load_scenarios(name: &str) -> Vec<Scenario> {
    let path = data_root().join("scenarios").join(format!("{}.scen", name));
    let file = File::open(path).expect("Could not open scenario file");

    let reader = io::BufReader::new(file);
    let mut lines = reader.lines();

    // Version line
    lines.next();

    let remaining_data = lines
        .collect::<Result<Vec<_>, _>>()
        .expect("Could not read scenario file")
        .join("\n");

    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_reader(remaining_data.as_bytes());
    csv_reader
        .deserialize()
        .map(|result| result.expect("Could not parse scenario record"))
        .collect()
}

/// Names of every terrain that has a file under `terrain/`, sorted.
pub fn get_benchmark_names() -> Vec<String> {
    let root = data_root().join("terrain");
    let mut names = Vec::new();
    for entry in WalkDir::new(&root).min_depth(1).max_depth(1) {
        let entry = entry.expect("Could not get dir entry");
        let path = entry.path();
        if path.extension().map_or(false, |ext| ext == "csv") {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_owned());
            }
        }
    }
    names.sort();
    names
}

/// Terrain patches and scenarios of the named benchmark.
pub fn get_benchmark(name: &str) -> (Vec<TerrainBox>, Vec<Scenario>) {
    let benchmark_names = get_benchmark_names();
    if benchmark_names.iter().any(|known| known == name) {
        (load_terrain(name), load_scenarios(name))
    } else {
        panic!("Could not load benchmark {}!", name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_terrain_has_scenarios() {
        let names = get_benchmark_names();
        assert_eq!(names, vec!["flat", "gap", "stairs", "stepping_stones"]);
        for name in names {
            let (terrain, scenarios) = get_benchmark(&name);
            assert!(!terrain.is_empty());
            assert!(!scenarios.is_empty());
            assert!(scenarios.iter().all(|scenario| scenario.terrain == name));
        }
    }

    #[test]
    fn gap_is_infeasible() {
        let (_, scenarios) = get_benchmark("gap");
        assert_eq!(scenarios[0].expected, ExpectedOutcome::Infeasible);
        assert_eq!(scenarios[0].goal_x, 2.5);
    }
}
