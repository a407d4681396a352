use plant_gen::{generate, SpeciesConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "assets/plant_config.toml".to_string());

    let result = SpeciesConfig::load(&path).and_then(|species| generate(&species));
    match result {
        Ok(plant) => {
            for segment in &plant.mesh.segments {
                log::debug!(
                    "{:?} of {:?}: {} triangles",
                    segment.kind,
                    segment.stem,
                    segment.indices.len() / 3
                );
            }
        }
        Err(e) => {
            log::error!("{path}: {e}");
            std::process::exit(1);
        }
    }
}
