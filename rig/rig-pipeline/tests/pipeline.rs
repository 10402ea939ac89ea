//! End-to-end pipeline scenarios.

use approx::assert_relative_eq;
use nalgebra::{Point3, UnitQuaternion, Vector3};
use rig_mesh::{Mesh, Transform};
use rig_mesh_io::read_stl;
use rig_pipeline::{rig, rig_with_given_embedding, write_skeleton_out, RigError};
use rig_skeleton::{Skeleton, SkeletonBuilder};

/// A unit icosahedron: 12 vertices, 20 triangles, CCW outward winding.
fn icosahedron() -> Mesh {
    let t = (1.0 + 5.0_f64.sqrt()) / 2.0;
    let positions = vec![
        Point3::new(-1.0, t, 0.0),
        Point3::new(1.0, t, 0.0),
        Point3::new(-1.0, -t, 0.0),
        Point3::new(1.0, -t, 0.0),
        Point3::new(0.0, -1.0, t),
        Point3::new(0.0, 1.0, t),
        Point3::new(0.0, -1.0, -t),
        Point3::new(0.0, 1.0, -t),
        Point3::new(t, 0.0, -1.0),
        Point3::new(t, 0.0, 1.0),
        Point3::new(-t, 0.0, -1.0),
        Point3::new(-t, 0.0, 1.0),
    ];
    let triangles = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    Mesh::from_soup(positions, triangles).unwrap()
}

/// A subdivided box mesh with welded shared edges and outward winding.
fn subdivided_box(min: Point3<f64>, max: Point3<f64>, n: usize) -> Mesh {
    use std::collections::HashMap;
    let mut positions: Vec<Point3<f64>> = Vec::new();
    let mut index: HashMap<(i64, i64, i64), u32> = HashMap::new();
    let mut triangles: Vec<[u32; 3]> = Vec::new();

    let mut vert = |p: Point3<f64>| -> u32 {
        let key = (
            (p.x * 1e6).round() as i64,
            (p.y * 1e6).round() as i64,
            (p.z * 1e6).round() as i64,
        );
        *index.entry(key).or_insert_with(|| {
            positions.push(p);
            (positions.len() - 1) as u32
        })
    };

    for (axis, positive) in [(0, false), (0, true), (1, false), (1, true), (2, false), (2, true)] {
        let u = (axis + 1) % 3;
        let v = (axis + 2) % 3;
        let corner = |i: usize, j: usize| {
            let mut c = [0.0f64; 3];
            c[axis] = if positive { max[axis] } else { min[axis] };
            c[u] = min[u] + (max[u] - min[u]) * (i as f64) / (n as f64);
            c[v] = min[v] + (max[v] - min[v]) * (j as f64) / (n as f64);
            Point3::new(c[0], c[1], c[2])
        };
        for i in 0..n {
            for j in 0..n {
                let p00 = vert(corner(i, j));
                let p10 = vert(corner(i + 1, j));
                let p11 = vert(corner(i + 1, j + 1));
                let p01 = vert(corner(i, j + 1));
                if positive {
                    triangles.push([p00, p10, p11]);
                    triangles.push([p00, p11, p01]);
                } else {
                    triangles.push([p00, p11, p10]);
                    triangles.push([p00, p01, p11]);
                }
            }
        }
    }

    Mesh::from_soup(positions, triangles).unwrap()
}

/// A stretched box standing in for a capsule: tall in y, sized so the
/// template human skeleton fits inside it.
fn stretched_capsule() -> Mesh {
    subdivided_box(
        Point3::new(-0.35, -0.5, -0.2),
        Point3::new(0.35, 0.5, 0.2),
        4,
    )
}

fn single_bone_skeleton() -> Skeleton {
    SkeletonBuilder::new()
        .joint("base", Point3::new(0.0, 0.0, -1.0), None)
        .joint("tip", Point3::new(0.0, 0.0, 1.0), Some("base"))
        .build()
        .unwrap()
}

#[test]
fn icosahedron_single_bone_full_pipeline() {
    let mut mesh = icosahedron();
    mesh.normalize_bounding_box();

    let mut skeleton = single_bone_skeleton();
    skeleton.scale(0.7);

    let output = rig(&skeleton, &mesh).unwrap();
    assert_eq!(output.embedding.len(), 2);
    assert_eq!(output.attachment.bone_count(), 1);

    // one bone owns every vertex completely
    for i in 0..mesh.vertex_count() {
        assert_relative_eq!(output.attachment.weights(i)[0], 1.0, epsilon = 1e-9);
    }

    // deforming by a rotation about y rotates every vertex rigidly
    let rot = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2);
    let posed = output
        .attachment
        .deform(&mesh, &[Transform::from_rotation(rot)])
        .unwrap();
    for (a, b) in posed.vertices.iter().zip(&mesh.vertices) {
        let expected = rot.transform_point(&b.position);
        assert_relative_eq!((a.position - expected).norm(), 0.0, epsilon = 1e-6);
    }
}

#[test]
fn capsule_human_no_fit_writes_eighteen_rows() {
    let mut mesh = stretched_capsule();
    mesh.normalize_bounding_box();

    let skeleton = Skeleton::human();
    let output = rig_with_given_embedding(&skeleton, &mesh).unwrap();
    assert_eq!(output.embedding.len(), 18);

    // the embedding is the template mapped through the normalization
    for (embedded, &template) in output.embedding.iter().zip(skeleton.full_positions()) {
        let back = mesh.to_original_frame(*embedded);
        assert_relative_eq!((back - template).norm(), 0.0, epsilon = 1e-12);
    }

    let path = std::env::temp_dir().join("rig_pipeline_skeleton_out_test");
    write_skeleton_out(&path, &mesh, &skeleton, &output.embedding).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    std::fs::remove_file(&path).ok();

    let rows: Vec<&str> = contents.lines().collect();
    assert_eq!(rows.len(), 18);
    for (i, row) in rows.iter().enumerate() {
        let fields: Vec<&str> = row.split_whitespace().collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].parse::<usize>().unwrap(), i);
        assert_eq!(
            fields[4].parse::<i32>().unwrap(),
            skeleton.full_parent()[i]
        );
    }
}

#[test]
fn disconnected_mesh_aborts_not_connected() {
    // two tetrahedra far apart
    let tetra = |offset: Vector3<f64>| {
        vec![
            Point3::from(Vector3::new(0.0, 0.0, 0.0) + offset),
            Point3::from(Vector3::new(1.0, 0.0, 0.0) + offset),
            Point3::from(Vector3::new(0.0, 1.0, 0.0) + offset),
            Point3::from(Vector3::new(0.0, 0.0, 1.0) + offset),
        ]
    };
    let mut positions = tetra(Vector3::zeros());
    positions.extend(tetra(Vector3::new(5.0, 0.0, 0.0)));
    let mut triangles = vec![[0u32, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
    triangles.extend([[4u32, 6, 5], [4, 5, 7], [4, 7, 6], [5, 6, 7]]);

    let mut mesh = Mesh::from_soup(positions, triangles).unwrap();
    mesh.normalize_bounding_box();

    let mut skeleton = single_bone_skeleton();
    skeleton.scale(0.7);

    let err = rig(&skeleton, &mesh).unwrap_err();
    assert!(matches!(err, RigError::NotConnected));
    assert_eq!(err.to_string(), "mesh is not connected");
}

#[test]
fn stl_with_degenerate_facet_loads_one_triangle_short() {
    // a tetrahedron in STL form plus one degenerate facet (repeated vertex)
    let v = [
        (0.0, 0.0, 0.0),
        (1.0, 0.0, 0.0),
        (0.0, 1.0, 0.0),
        (0.0, 0.0, 1.0),
    ];
    let faces = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];

    let mut stl = String::from("solid tetra\n");
    let mut facet = |a: (f64, f64, f64), b: (f64, f64, f64), c: (f64, f64, f64)| {
        stl.push_str("facet normal 0 0 0\nouter loop\n");
        for p in [a, b, c] {
            stl.push_str(&format!("vertex {} {} {}\n", p.0, p.1, p.2));
        }
        stl.push_str("endloop\nendfacet\n");
    };
    for f in faces {
        facet(v[f[0]], v[f[1]], v[f[2]]);
    }
    // the degenerate facet repeats a vertex and is dropped by the reader
    facet(v[0], v[0], v[1]);
    stl.push_str("endsolid tetra\n");

    let raw_facets = 5;
    let (positions, triangles) = read_stl(std::io::Cursor::new(stl)).unwrap();
    assert_eq!(triangles.len(), raw_facets - 1);

    let mesh = Mesh::from_soup(positions, triangles).unwrap();
    assert!(mesh.integrity_check().is_ok());
    assert_eq!(mesh.triangle_count(), 4);
}

#[test]
fn duplicated_triangle_pair_cancels() {
    // the same tetrahedron with one face listed twice: the pair cancels and
    // the surface opens, which validation must reject
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(1.0, 0.0, 0.0),
        Point3::new(0.0, 1.0, 0.0),
        Point3::new(0.0, 0.0, 1.0),
    ];
    let triangles = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3], [1, 2, 3]];
    assert!(Mesh::from_soup(positions, triangles).is_err());
}

#[test]
fn obj_round_trip_preserves_topology_and_positions() {
    let mesh = icosahedron();
    let path = std::env::temp_dir().join("rig_pipeline_roundtrip.obj");
    rig_mesh_io::write_obj(&mesh, &path).unwrap();
    let reread = rig_mesh_io::load_mesh(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(reread.vertex_count(), mesh.vertex_count());
    assert_eq!(reread.triangle_count(), mesh.triangle_count());
    assert!(reread.integrity_check().is_ok());
    for (a, b) in reread.vertices.iter().zip(&mesh.vertices) {
        assert_relative_eq!((a.position - b.position).norm(), 0.0, epsilon = 1e-12);
    }
}
