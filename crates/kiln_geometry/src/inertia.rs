//! Mass, center of mass, and inertia tensor for collision shapes.
//!
//! Closed meshes use the signed-tetrahedron decomposition of Blow and
//! Binstock: each triangle forms a tetrahedron with the origin, and the
//! covariance of the canonical tetrahedron is mapped onto it. Hollow meshes
//! treat each triangle as a point mass at its centroid.

use crate::quickhull::{convex_hull, Hull, DEFAULT_PRECISION};
use crate::warning::KernelWarning;
use glam::{DMat3, DVec3};
use kiln_graph::{Shape, Triangle};
use std::f64::consts::PI;

/// Mass properties of a shape at a given density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MassProperties {
    /// Total mass.
    pub mass: f64,
    /// Center of mass.
    pub center: DVec3,
    /// Inertia tensor about the center of mass.
    pub inertia: DMat3,
    /// The mesh was wound inside-out; mass and inertia have been flipped.
    pub mis_wound: bool,
}

impl MassProperties {
    /// All zeros.
    pub const ZERO: Self = Self {
        mass: 0.0,
        center: DVec3::ZERO,
        inertia: DMat3::ZERO,
        mis_wound: false,
    };

    fn diagonal(mass: f64, diag: DVec3) -> Self {
        Self {
            mass,
            center: DVec3::ZERO,
            inertia: DMat3::from_diagonal(diag),
            mis_wound: false,
        }
    }

    /// The inertia tensor as row-major `f32` rows.
    pub fn inertia_rows(&self) -> [[f32; 3]; 3] {
        // Symmetric, so columns and rows coincide.
        let c = self.inertia.to_cols_array_2d();
        c.map(|row| row.map(|x| x as f32))
    }
}

/// A sphere of the given radius.
pub fn sphere(radius: f64, density: f64, solid: bool) -> MassProperties {
    let (mass, i) = if solid {
        let mass = density * 4.0 * PI * radius.powi(3) / 3.0;
        (mass, 2.0 * mass * radius * radius / 5.0)
    } else {
        let mass = density * 4.0 * PI * radius * radius;
        (mass, 2.0 * mass * radius * radius / 3.0)
    };
    MassProperties::diagonal(mass, DVec3::splat(i))
}

/// An axis-aligned box with full edge lengths `size`.
pub fn cuboid(size: DVec3, density: f64, solid: bool) -> MassProperties {
    if solid {
        let mass = density * size.x * size.y * size.z;
        let t = mass * size * size / 12.0;
        return MassProperties::diagonal(mass, DVec3::new(t.y + t.z, t.z + t.x, t.x + t.y));
    }
    // Six thin plates; `face[i]` is the mass of one face normal to axis i.
    let s2 = (size * size).to_array();
    let face = (density * DVec3::new(size.y * size.z, size.z * size.x, size.x * size.y)).to_array();
    let about = |i: usize| {
        let (j, k) = ((i + 1) % 3, (i + 2) % 3);
        2.0 * (face[i] * (s2[j] + s2[k]) / 12.0
            + face[j] * (s2[k] / 12.0 + s2[j] / 4.0)
            + face[k] * (s2[j] / 12.0 + s2[k] / 4.0))
    };
    let mass = 2.0 * face.iter().sum::<f64>();
    MassProperties::diagonal(mass, DVec3::new(about(0), about(1), about(2)))
}

/// A capsule along z; the inertia approximates it by its cylinder.
pub fn capsule(length: f64, radius: f64, density: f64, solid: bool) -> MassProperties {
    let r2 = radius * radius;
    let (mass, ixx, izz) = if solid {
        let mass = density * (length * PI * r2 + 4.0 * PI * r2 * radius / 3.0);
        (mass, mass * (3.0 * r2 + length * length) / 12.0, 0.5 * mass * r2)
    } else {
        let mass = density * (length * 2.0 * PI * radius + 2.0 * PI * r2);
        (mass, mass * (6.0 * r2 + length * length) / 12.0, mass * r2)
    };
    MassProperties::diagonal(mass, DVec3::new(ixx, ixx, izz))
}

/// A triangle mesh. Solid meshes must be closed and outward-wound; an
/// inward-wound mesh comes back with `mis_wound` set.
pub fn polyhedron(
    vertices: &[DVec3],
    triangles: &[Triangle],
    density: f64,
    solid: bool,
) -> MassProperties {
    // 120 times the covariance of the tetrahedron (0, e_x, e_y, e_z).
    let canonical = DMat3::from_cols_array_2d(&[[2.0, 1.0, 1.0], [1.0, 2.0, 1.0], [1.0, 1.0, 2.0]]);

    let mut mass = 0.0;
    let mut weighted_center = DVec3::ZERO;
    let mut covariance = DMat3::ZERO;
    for tri in triangles {
        let Some([v0, v1, v2]) = corners(vertices, tri) else {
            continue;
        };
        if solid {
            let a = DMat3::from_cols(v0, v1, v2);
            let det = a.determinant();
            let m = det / 6.0;
            covariance += a * canonical * a.transpose() * det;
            mass += m;
            weighted_center += (v0 + v1 + v2) * 0.25 * m;
        } else {
            let m = (v1 - v0).cross(v2 - v0).length() / 2.0;
            let c = (v0 + v1 + v2) / 3.0;
            covariance += outer(c, c) * m;
            mass += m;
            weighted_center += c * m;
        }
    }
    if mass == 0.0 {
        return MassProperties::ZERO;
    }
    if solid {
        covariance *= 1.0 / 120.0;
    }
    let center = weighted_center / mass;
    covariance -= outer(center, center) * mass;
    let trace = covariance.x_axis.x + covariance.y_axis.y + covariance.z_axis.z;
    let mut inertia = (DMat3::from_diagonal(DVec3::splat(trace)) - covariance) * density;
    mass *= density;

    let mis_wound = mass < 0.0;
    if mis_wound {
        mass = -mass;
        inertia = -inertia;
    }
    MassProperties {
        mass,
        center,
        inertia,
        mis_wound,
    }
}

fn corners(vertices: &[DVec3], tri: &Triangle) -> Option<[DVec3; 3]> {
    let [a, b, c] = *tri;
    Some([
        *vertices.get(a as usize)?,
        *vertices.get(b as usize)?,
        *vertices.get(c as usize)?,
    ])
}

fn outer(a: DVec3, b: DVec3) -> DMat3 {
    DMat3::from_cols(a * b.x, a * b.y, a * b.z)
}

fn to_dvec(v: &[f32; 3]) -> DVec3 {
    DVec3::new(v[0] as f64, v[1] as f64, v[2] as f64)
}

/// Mass properties of `shape`, plus warnings for zero mass and inside-out
/// meshes. Convex shapes are measured on the hull of their vertices.
pub fn mass_properties(
    shape: &Shape,
    density: f64,
    solid: bool,
) -> (MassProperties, Vec<KernelWarning>) {
    let mut warnings = Vec::new();
    let props = match shape {
        Shape::Sphere { radius } => sphere(*radius as f64, density, solid),
        Shape::Box { size } => cuboid(to_dvec(size), density, solid),
        Shape::Capsule { length, radius } => {
            capsule(*length as f64, *radius as f64, density, solid)
        }
        Shape::Convex { vertices, .. } => {
            let points: Vec<DVec3> = vertices.iter().map(to_dvec).collect();
            match convex_hull(&points, DEFAULT_PRECISION).hull {
                Hull::Polytope { vertices, faces } => {
                    polyhedron(&vertices, &faces, density, solid)
                }
                _ => MassProperties::ZERO,
            }
        }
        Shape::TriMesh {
            vertices,
            triangles,
        } => {
            let points: Vec<DVec3> = vertices.iter().map(to_dvec).collect();
            polyhedron(&points, triangles, density, solid)
        }
    };
    if props.mass == 0.0 || !props.mass.is_finite() {
        warnings.push(KernelWarning::ZeroMass);
        return (MassProperties::ZERO, warnings);
    }
    if props.mis_wound {
        warnings.push(KernelWarning::MisWound);
    }
    (props, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_mesh(size: DVec3) -> (Vec<DVec3>, Vec<Triangle>) {
        let mut vertices = Vec::new();
        for i in 0..8 {
            vertices.push(DVec3::new(
                if i & 1 != 0 { size.x } else { 0.0 },
                if i & 2 != 0 { size.y } else { 0.0 },
                if i & 4 != 0 { size.z } else { 0.0 },
            ));
        }
        let triangles = vec![
            [0, 2, 1], [1, 2, 3], // z = 0
            [4, 5, 6], [5, 7, 6], // z = max
            [0, 1, 4], [1, 5, 4], // y = 0
            [2, 6, 3], [3, 6, 7], // y = max
            [0, 4, 2], [2, 4, 6], // x = 0
            [1, 3, 5], [3, 7, 5], // x = max
        ];
        (vertices, triangles)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn primitive_boxes() {
        let p = cuboid(DVec3::new(1.0, 2.0, 3.0), 4.0, true);
        assert_close(p.mass, 24.0);
        assert_eq!(p.inertia, DMat3::from_diagonal(DVec3::new(26.0, 20.0, 10.0)));
    }

    #[test]
    fn hollow_box_is_six_plates() {
        let cube = cuboid(DVec3::ONE, 2.0, false);
        assert_close(cube.mass, 12.0);
        for i in 0..3 {
            assert_close(cube.inertia.col(i)[i], 5.0 / 18.0 * cube.mass);
        }
        let p = cuboid(DVec3::new(1.0, 2.0, 3.0), 1.0, false);
        assert_close(p.mass, 22.0);
        assert_close(p.inertia.x_axis.x, 203.0 / 6.0);
        assert_close(p.inertia.col(1)[0], 0.0);
    }

    #[test]
    fn sphere_matches_closed_form() {
        let p = sphere(2.0, 3.0, true);
        assert_close(p.mass, 3.0 * 4.0 * PI * 8.0 / 3.0);
        assert_close(p.inertia.x_axis.x, 0.4 * p.mass * 4.0);
    }

    #[test]
    fn unit_cube_mesh() {
        let (v, t) = box_mesh(DVec3::ONE);
        let p = polyhedron(&v, &t, 1.0, true);
        assert_close(p.mass, 1.0);
        assert!((p.center - DVec3::splat(0.5)).length() < 1e-12);
        for i in 0..3 {
            assert_close(p.inertia.col(i)[i], 1.0 / 6.0);
            assert_close(p.inertia.col(i)[(i + 1) % 3], 0.0);
        }
        assert!(!p.mis_wound);
    }

    #[test]
    fn mesh_matches_primitive_box() {
        let (v, t) = box_mesh(DVec3::new(1.0, 2.0, 3.0));
        let p = polyhedron(&v, &t, 4.0, true);
        assert_close(p.mass, 24.0);
        assert!((p.center - DVec3::new(0.5, 1.0, 1.5)).length() < 1e-12);
        let expected = [26.0, 20.0, 10.0];
        for i in 0..3 {
            assert_close(p.inertia.col(i)[i], expected[i]);
        }
    }

    #[test]
    fn reversed_winding_is_flagged() {
        let (v, t) = box_mesh(DVec3::ONE);
        let reversed: Vec<Triangle> = t.iter().map(|&[a, b, c]| [a, c, b]).collect();
        let p = polyhedron(&v, &reversed, 1.0, true);
        assert!(p.mis_wound);
        assert_close(p.mass, 1.0);
        assert_close(p.inertia.x_axis.x, 1.0 / 6.0);

        let shape = Shape::TriMesh {
            vertices: v.iter().map(|p| [p.x as f32, p.y as f32, p.z as f32]).collect(),
            triangles: reversed,
        };
        let (_, warnings) = mass_properties(&shape, 1.0, true);
        assert_eq!(warnings, vec![KernelWarning::MisWound]);
    }

    #[test]
    fn hollow_mesh_uses_surface_area() {
        let (v, t) = box_mesh(DVec3::ONE);
        let p = polyhedron(&v, &t, 2.0, false);
        assert_close(p.mass, 12.0);
        assert!((p.center - DVec3::splat(0.5)).length() < 1e-12);
    }

    #[test]
    fn convex_shape_goes_through_hull() {
        let (v, _) = box_mesh(DVec3::ONE);
        let shape = Shape::Convex {
            vertices: v.iter().map(|p| [p.x as f32, p.y as f32, p.z as f32]).collect(),
            planes: Vec::new(),
        };
        let (p, warnings) = mass_properties(&shape, 1.0, true);
        assert!(warnings.is_empty());
        assert_close(p.mass, 1.0);
    }

    #[test]
    fn flat_input_has_zero_mass() {
        let shape = Shape::Convex {
            vertices: vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            planes: Vec::new(),
        };
        let (p, warnings) = mass_properties(&shape, 1.0, true);
        assert_eq!(p, MassProperties::ZERO);
        assert_eq!(warnings, vec![KernelWarning::ZeroMass]);
        let (_, warnings) = mass_properties(&Shape::Sphere { radius: 0.0 }, 1.0, true);
        assert_eq!(warnings, vec![KernelWarning::ZeroMass]);
    }
}
