use fastpack::scene::{Polygon, UvLayer};
use fastpack::{
    load_scene, load_scene_from_bytes, FastpackError, Interpolation, Material, MaterialNode, Mesh,
    NodeKind, PackSession, PackerConfig, Scene, SceneImage, SceneObject,
};
use glam::Vec2;
use image::{Rgba, RgbaImage};
use std::collections::BTreeSet;
use std::io::{Cursor, Write};
use std::path::Path;

const WOOD: [u8; 4] = [200, 150, 100, 255];
const NORMAL: [u8; 4] = [128, 128, 255, 255];

fn quad(uv_name: &str, offset: Vec2) -> Mesh {
    let coords = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ]
    .iter()
    .map(|&uv| uv + offset)
    .collect();

    Mesh::new()
        .with_uv_layer(UvLayer::new(uv_name, coords))
        .with_polygon(Polygon::new(0, 4, 0))
}

fn direct_material(name: &str, image: &str) -> Material {
    Material::new(name)
        .with_node(MaterialNode::new("Out", NodeKind::Output))
        .with_node(MaterialNode::image_texture("Tex", image))
        .with_link("Tex", "Color", "Out", "Surface")
}

/// Two objects on differently named UV maps sharing one image.
fn shared_image_scene() -> Scene {
    let mut scene = Scene::new();
    scene.add_image(SceneImage::solid("wood", 64, 64, WOOD));
    scene.add_material(direct_material("wood_a", "wood"));
    scene.add_material(direct_material("wood_b", "wood"));
    scene.add_object(SceneObject::new("a", quad("UVMap", Vec2::ZERO)).with_material("wood_a"));
    scene.add_object(
        SceneObject::new("b", quad("UVMap.001", Vec2::new(2.0, 2.0))).with_material("wood_b"),
    );
    scene
}

fn no_blacklist() -> BTreeSet<String> {
    BTreeSet::new()
}

const CRATE_SCENE: &str = r#"{
    "images": [{"name": "wood", "path": "textures/wood.png"}],
    "materials": [{
        "name": "wood",
        "nodes": [
            {"name": "Out", "type": "ShaderNodeOutputMaterial"},
            {"name": "Tex", "type": "ShaderNodeTexImage", "image": "wood", "interpolation": "Closest"}
        ],
        "links": [
            {"from_node": "Tex", "from_socket": "Color", "to_node": "Out", "to_socket": "Surface"}
        ]
    }],
    "objects": [{
        "name": "crate",
        "material_slots": ["wood"],
        "mesh": {
            "uv_layers": [{"name": "UVMap", "data": [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]}],
            "polygons": [{"loop_start": 0, "loop_total": 4}]
        }
    }]
}"#;

fn wood_png() -> Vec<u8> {
    let mut png = Vec::new();
    RgbaImage::from_pixel(16, 16, Rgba(WOOD))
        .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
        .unwrap();
    png
}

/// Alpha compositing may round a channel by one.
fn assert_color(actual: [u8; 4], expected: [u8; 4]) {
    for (a, e) in actual.iter().zip(expected) {
        assert!(a.abs_diff(e) <= 1, "{:?} != {:?}", actual, expected);
    }
}

#[test]
fn test_simple_merge_build() {
    let mut scene = shared_image_scene();
    let objects = scene.object_ids();
    let session = PackSession::refresh(&scene, &objects, &no_blacklist()).unwrap();

    // One image, one set spanning both objects.
    assert_eq!(session.entries().len(), 1);
    assert_eq!(session.sub_uv_sets().len(), 1);
    assert_eq!(session.sub_uv_sets()[0].references.len(), 2);
    assert_eq!(session.groups()[0].socket, "Surface");

    let out = tempfile::tempdir().unwrap();
    let config = PackerConfig::default()
        .with_max_resolution(128)
        .with_output_dir(out.path());
    let report = session.build(&mut scene, &config).unwrap();

    assert_eq!(report.atlases.len(), 1);
    assert_eq!(report.uv_edits, 8);
    assert_eq!(report.swapped_nodes, 2);

    // The island is half the atlas wide and was moved home from tile (2, 2).
    let b = &scene.objects[1].mesh;
    assert_eq!(b.uv(0, 0), Some(Vec2::new(0.0, 0.0)));
    assert_eq!(b.uv(0, 2), Some(Vec2::new(0.5, 0.5)));
    let a = &scene.objects[0].mesh;
    assert_eq!(a.uv(0, 2), Some(Vec2::new(0.5, 0.5)));

    for material in &scene.materials {
        assert_eq!(material.nodes[1].image.as_deref(), Some("atlas_0"));
    }

    let path = out.path().join("0.png");
    assert_eq!(report.atlases[0].path.as_deref(), Some(path.as_path()));
    let atlas = image::open(&path).unwrap().to_rgba8();
    assert_eq!(atlas.dimensions(), (128, 128));
    // UV origin is bottom-left, so the image lands in the lower-left corner.
    assert_color(atlas.get_pixel(0, 127).0, WOOD);
    assert_eq!(atlas.get_pixel(127, 0).0[3], 0);
}

#[test]
fn test_regroup_into_one_atlas() {
    let mut scene = Scene::new();
    scene.add_image(SceneImage::solid("albedo", 64, 64, WOOD));
    scene.add_image(SceneImage::solid("normal", 32, 32, NORMAL));
    scene.add_material(
        Material::new("pbr")
            .with_node(MaterialNode::new("Out", NodeKind::Output))
            .with_node(MaterialNode::new("BSDF", NodeKind::other("principled_bsdf")))
            .with_node(MaterialNode::image_texture("Albedo", "albedo"))
            .with_node(
                MaterialNode::image_texture("Normal", "normal")
                    .with_interpolation(Interpolation::Nearest),
            )
            .with_link("BSDF", "BSDF", "Out", "Surface")
            .with_link("Albedo", "Color", "BSDF", "Base Color")
            .with_link("Normal", "Color", "BSDF", "Normal"),
    );
    scene.add_object(SceneObject::new("box", quad("UVMap", Vec2::ZERO)).with_material("pbr"));

    let objects = scene.object_ids();
    let mut session = PackSession::refresh(&scene, &objects, &no_blacklist()).unwrap();
    assert_eq!(session.groups().len(), 2);
    session.set_group("Normal", 0).unwrap();

    let config = PackerConfig::default()
        .with_max_resolution(64)
        .with_write_files(false);
    let report = session.build(&mut scene, &config).unwrap();

    assert_eq!(report.atlases.len(), 1);
    let material = &scene.materials[0];
    assert_eq!(material.nodes[2].image.as_deref(), Some("atlas_0"));
    assert_eq!(material.nodes[3].image.as_deref(), Some("atlas_0"));

    // The normal map is upscaled to the albedo's size and pasted last.
    let atlas = scene.image("atlas_0").unwrap().load_pixels().unwrap();
    assert_eq!(atlas.dimensions(), (64, 64));
    assert_color(atlas.get_pixel(32, 32).0, NORMAL);
}

#[test]
fn test_packing_failure_leaves_scene_untouched() {
    let mut scene = Scene::new();
    scene.add_image(SceneImage::solid("a", 60, 60, WOOD));
    scene.add_image(SceneImage::solid("b", 60, 60, NORMAL));
    scene.add_material(direct_material("a", "a"));
    scene.add_material(direct_material("b", "b"));
    scene.add_object(SceneObject::new("a", quad("UVMap", Vec2::ZERO)).with_material("a"));
    scene.add_object(SceneObject::new("b", quad("UVMap", Vec2::new(1.0, 0.0))).with_material("b"));
    let before = scene.clone();

    let objects = scene.object_ids();
    let session = PackSession::refresh(&scene, &objects, &no_blacklist()).unwrap();
    let out = tempfile::tempdir().unwrap();
    let config = PackerConfig::default()
        .with_max_resolution(100)
        .with_output_dir(out.path());

    // 0.72 of the square is needed, but two 0.6-wide islands cannot sit side by side.
    let result = session.build(&mut scene, &config);
    assert!(matches!(result, Err(FastpackError::Packing { islands: 2 })));

    for (after, original) in scene.objects.iter().zip(&before.objects) {
        assert_eq!(after.mesh, original.mesh);
    }
    assert_eq!(scene.materials, before.materials);
    assert_eq!(scene.images.len(), before.images.len());
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
fn test_bundle_to_baked_scene() {
    let png = wood_png();
    let mut bundle = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(Cursor::new(&mut bundle));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("scene.json", options).unwrap();
        writer.write_all(CRATE_SCENE.as_bytes()).unwrap();
        writer.start_file("textures/wood.png", options).unwrap();
        writer.write_all(&png).unwrap();
        writer.finish().unwrap();
    }

    let mut scene = load_scene_from_bytes(&bundle).unwrap();
    let config = PackerConfig::default()
        .with_max_resolution(32)
        .with_write_files(false);
    let session = PackSession::refresh(&scene, &scene.object_ids(), &config.node_blacklist).unwrap();
    session.build(&mut scene, &config).unwrap();

    let out = tempfile::tempdir().unwrap();
    let baked = out.path().join("scene_baked.json");
    scene.save_json(&baked).unwrap();

    let reloaded = Scene::from_json(&std::fs::read_to_string(&baked).unwrap()).unwrap();
    assert_eq!(reloaded.materials[0].nodes[1].image.as_deref(), Some("atlas_0"));
    let atlas = reloaded.image("atlas_0").unwrap();
    assert_eq!((atlas.width, atlas.height), (32, 32));
    assert!(reloaded.image("wood").unwrap().path.is_none());
    assert_eq!(reloaded.objects[0].mesh.uv(0, 2), Some(Vec2::new(0.5, 0.5)));
}

#[test]
fn test_baked_scene_reloads_with_atlases() {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir(root.path().join("textures")).unwrap();
    std::fs::write(root.path().join("textures/wood.png"), wood_png()).unwrap();
    std::fs::write(root.path().join("scene.json"), CRATE_SCENE).unwrap();

    let mut scene = load_scene(root.path()).unwrap();
    let config = PackerConfig::default()
        .with_max_resolution(32)
        .with_output_dir(root.path().join("atlases"));
    let session = PackSession::refresh(&scene, &scene.object_ids(), &config.node_blacklist).unwrap();
    session.build(&mut scene, &config).unwrap();

    let baked = root.path().join("scene_baked.json");
    scene.save_json(&baked).unwrap();

    let reloaded = load_scene(&baked).unwrap();
    let atlas = reloaded.image("atlas_0").unwrap();
    assert_eq!(atlas.path.as_deref(), Some(root.path().join("atlases/0.png").as_path()));
    let pixels = atlas.load_pixels().unwrap();
    assert_eq!(pixels.dimensions(), (32, 32));
    assert_color(pixels.get_pixel(0, 31).0, WOOD);
    assert!(reloaded.image("wood").unwrap().load_pixels().is_ok());

    // Stored paths are relative, so the baked scene survives a move.
    let saved = Scene::from_json(&std::fs::read_to_string(&baked).unwrap()).unwrap();
    let stored = |name: &str| saved.image(name).and_then(|i| i.path.clone());
    assert_eq!(stored("atlas_0").as_deref(), Some(Path::new("atlases/0.png")));
    assert_eq!(stored("wood").as_deref(), Some(Path::new("textures/wood.png")));
}
