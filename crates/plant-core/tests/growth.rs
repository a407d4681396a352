use glam::Vec3;
use plant_core::{
    Generator, GeneratorConfig, Grow, LeafData, MeshBuilder, MeshConfig, Plant, PlantConfig,
    PlantMesh, Seed, SegmentKind, StemData, Wind, PRIMITIVE_RESTART,
};

fn bushy_config() -> PlantConfig {
    let mut config = PlantConfig {
        cycles: 3,
        nodes: 3,
        ..Default::default()
    };
    config
        .parameters
        .set_data(
            "",
            StemData {
                density: 3.,
                distance: 0.2,
                radius_threshold: 0.,
                seed: 11,
                leaf: LeafData {
                    density: 4.,
                    leaves_per_node: 2,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap();
    config.parameters.add_child("", "branches").unwrap();
    config
        .parameters
        .set_data(
            "branches",
            StemData {
                density: 1.,
                length: 0.2,
                seed: 12,
                ..Default::default()
            },
        )
        .unwrap();
    config
}

fn grow(config: &PlantConfig) -> Plant {
    Seed.grow::<Plant>(config, &mut Generator::new(GeneratorConfig::default()))
        .unwrap()
}

#[test]
fn growth_is_reproducible() {
    let config = bushy_config();
    let a = grow(&config);
    let b = grow(&config);
    assert!(a.stem_count() > 1);
    assert_eq!(a, b);
}

#[test]
fn hierarchy_invariants_hold_after_growth() {
    let plant = grow(&bushy_config());
    for (id, stem) in plant.stems() {
        let Some(parent) = stem.parent() else {
            assert_eq!(stem.depth(), 0);
            continue;
        };
        let parent_stem = plant.stem(parent).unwrap();
        assert_eq!(stem.depth(), parent_stem.depth() + 1);
        assert!(plant.children(parent).any(|c| c == id));

        let expected = parent_stem.location().unwrap()
            + parent_stem.path().intermediate(stem.distance()).point().unwrap();
        assert!((stem.location().unwrap() - expected).length() < 1e-4);
    }
    // children read their rules from the first child node
    let root = plant.root().unwrap();
    for child in plant.children(root) {
        let data = plant.stem(child).unwrap().parameter_tree().root_data().unwrap();
        assert_eq!(data.seed, 12);
    }
}

#[test]
fn radius_stays_within_bounds() {
    let plant = grow(&bushy_config());
    for (_, stem) in plant.stems() {
        let path = stem.path();
        for i in 0..path.len() {
            let r = path.radius_at(i);
            assert!(r >= path.min_radius() - 1e-6 && r <= path.max_radius() + 1e-6);
        }
    }
}

#[test]
fn mesh_segments_are_self_contained() {
    let result = grow(&bushy_config())
        .grow::<PlantMesh>(&MeshConfig::default(), &mut MeshBuilder::new())
        .unwrap();
    let mesh = &result.mesh;
    assert!(mesh.segments_of(SegmentKind::Leaf).count() > 0);

    let mut previous_end = 0;
    for segment in &mesh.segments {
        assert!(segment.indices.start >= previous_end);
        previous_end = segment.indices.end;
        assert_eq!(segment.indices.len() % 3, 0);
        for triangle in mesh.triangles(segment) {
            for index in triangle {
                assert_ne!(index, PRIMITIVE_RESTART);
                assert!(segment.points.contains(&index));
                assert!((index as usize) < mesh.points.len());
            }
        }
    }
    let separators = mesh.indices.iter().filter(|&&i| i == PRIMITIVE_RESTART).count();
    assert_eq!(separators, mesh.segments.len() - 1);
}

#[test]
fn wind_binds_every_stem() {
    let mut plant = grow(&bushy_config());
    let count = Wind::new(Vec3::X, 2.).generate(&mut plant).unwrap();
    let bound: usize = plant.stems().map(|(_, s)| s.joints().len()).sum();
    assert_eq!(count, bound);
    assert!(plant.stems().all(|(_, s)| s.has_joints()));
}

#[test]
fn plant_survives_serde() {
    let plant = grow(&bushy_config());
    let text = toml::to_string(&plant.stem(plant.root().unwrap()).unwrap().parameter_tree()).unwrap();
    let tree: plant_core::ParameterTree = toml::from_str(&text).unwrap();
    assert_eq!(&tree, plant.stem(plant.root().unwrap()).unwrap().parameter_tree());
}
