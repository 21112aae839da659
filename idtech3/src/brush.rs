//! Convex polytopes from brush half-spaces.
use std::f64::consts::TAU;

use glam::{DVec2, DVec3, DVec4, Vec2, Vec3};

/// Distance tolerance of the half-space and on-plane tests, in plane equation units.
pub const PLANE_EPSILON: f64 = 1e-5;
/// Offsets shorter than this from a face centroid have no usable angle.
pub const WINDING_LENGTH_EPSILON: f64 = 1e-12;
/// Cross products inside this band around zero count as the positive half turn.
pub const WINDING_SIGN_EPSILON: f64 = 1e-9;
/// Three normals spanning less volume than this do not meet in one point.
pub const SINGULAR_EPSILON: f64 = 1e-9;
/// Intersection points closer than this are one vertex.
pub const VERTEX_MERGE_EPSILON: f64 = 1e-4;
/// Planes whose normals and distances agree within this are the same plane.
pub const DUPLICATE_PLANE_EPSILON: f64 = 1e-6;

/// Maps a world position to texture coordinates: `u = s · (x, 1)`, `v = t · (x, 1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct UvProjection {
    pub s: DVec4,
    pub t: DVec4,
    /// Coordinates are in texels and are divided by the material size.
    pub texel_space: bool,
}

impl UvProjection {
    pub fn project(&self, point: DVec3, material_size: DVec2) -> Vec2 {
        let p = point.extend(1.0);
        let uv = DVec2::new(self.s.dot(p), self.t.dot(p));
        if self.texel_space {
            (uv / material_size).as_vec2()
        } else {
            uv.as_vec2()
        }
    }
}

/// One bounding half-space `dot(normal, x) <= dist` of a brush.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    pub normal: DVec3,
    pub dist: f64,
    /// Index into the caller's material list.
    pub material: u32,
    pub projection: Option<UvProjection>,
}

impl Plane {
    pub fn new(normal: DVec3, dist: f64, material: u32) -> Self {
        Self {
            normal,
            dist,
            material,
            projection: None,
        }
    }

    /// Plane through three points, facing the side from which they read clockwise.
    ///
    /// Returns `None` when the points are collinear.
    pub fn from_points(points: [DVec3; 3], material: u32) -> Option<Self> {
        let [a, b, c] = points;
        let normal = (c - a).cross(b - a).try_normalize()?;
        Some(Self::new(normal, a.dot(normal), material))
    }

    pub fn with_projection(mut self, projection: UvProjection) -> Self {
        self.projection = Some(projection);
        self
    }

    /// Positive outside the brush.
    pub fn distance_to(&self, point: DVec3) -> f64 {
        self.normal.dot(point) - self.dist
    }

    fn same_as(&self, other: &Plane) -> bool {
        (self.dist - other.dist).abs() <= DUPLICATE_PLANE_EPSILON
            && self.normal.abs_diff_eq(other.normal, DUPLICATE_PLANE_EPSILON)
    }

    /// Common point of three planes, `None` when their normals are linearly dependent.
    pub fn intersect(a: &Plane, b: &Plane, c: &Plane) -> Option<DVec3> {
        let bc = b.normal.cross(c.normal);
        let det = a.normal.dot(bc);
        if det.abs() < SINGULAR_EPSILON {
            return None;
        }
        let ca = c.normal.cross(a.normal);
        let ab = a.normal.cross(b.normal);
        Some((bc * a.dist + ca * b.dist + ab * c.dist) / det)
    }
}

/// Result of reconstructing one brush.
#[derive(Clone, Debug, Default)]
pub struct Polytope {
    pub vertices: Vec<DVec3>,
    /// Vertex indices of each face, counter-clockwise seen from outside.
    pub faces: Vec<Vec<u32>>,
    /// The plane each face lies on, parallel to `faces`.
    pub face_planes: Vec<Plane>,
}

impl Polytope {
    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Texture coordinates for the corners of `face`, zero when its plane has no projection.
    pub fn face_uvs(&self, face: usize, material_size: DVec2) -> Vec<Vec2> {
        let plane = &self.face_planes[face];
        self.faces[face]
            .iter()
            .map(|&v| match &plane.projection {
                Some(projection) => projection.project(self.vertices[v as usize], material_size),
                None => Vec2::ZERO,
            })
            .collect()
    }

    pub fn vertices_f32(&self) -> Vec<Vec3> {
        self.vertices.iter().map(|v| v.as_vec3()).collect()
    }
}

fn insert_vertex(vertices: &mut Vec<DVec3>, point: DVec3) -> u32 {
    match vertices
        .iter()
        .position(|v| v.abs_diff_eq(point, VERTEX_MERGE_EPSILON))
    {
        Some(i) => i as u32,
        None => {
            vertices.push(point);
            (vertices.len() - 1) as u32
        }
    }
}

/// Sorts `face` by angle around `normal`, starting from its first vertex.
fn wind(face: &mut [u32], vertices: &[DVec3], normal: DVec3) {
    let centroid =
        face.iter().map(|&i| vertices[i as usize]).sum::<DVec3>() / face.len() as f64;
    let offset = |i: u32| vertices[i as usize] - centroid;
    let reference = offset(face[0]);
    if reference.length() < WINDING_LENGTH_EPSILON {
        return;
    }
    let reference = reference.normalize();

    let angle = |i: u32| {
        let to = offset(i);
        if to.length() < WINDING_LENGTH_EPSILON {
            return 0.0;
        }
        let to = to.normalize();
        let a = reference.dot(to).clamp(-1.0, 1.0).acos();
        if normal.dot(reference.cross(to)) < -WINDING_SIGN_EPSILON {
            TAU - a
        } else {
            a
        }
    };

    face[1..].sort_by(|&a, &b| angle(a).total_cmp(&angle(b)));
}

/// Builds the convex polytope bounded by `planes`.
///
/// Planes that touch the solid in fewer than three points produce no face. A set of planes that
/// bounds no volume yields an empty polytope.
pub fn reconstruct(planes: &[Plane]) -> Polytope {
    let mut vertices = Vec::new();
    let mut on_plane: Vec<Vec<u32>> = vec![Vec::new(); planes.len()];

    for i in 0..planes.len() {
        for j in i + 1..planes.len() {
            for k in j + 1..planes.len() {
                let Some(point) = Plane::intersect(&planes[i], &planes[j], &planes[k]) else {
                    continue;
                };
                if planes
                    .iter()
                    .any(|plane| plane.distance_to(point) > PLANE_EPSILON)
                {
                    continue;
                }
                insert_vertex(&mut vertices, point);
            }
        }
    }

    for (p, plane) in planes.iter().enumerate() {
        if planes[..p].iter().any(|earlier| earlier.same_as(plane)) {
            continue;
        }
        on_plane[p] = vertices
            .iter()
            .enumerate()
            .filter(|(_, &v)| plane.distance_to(v).abs() <= PLANE_EPSILON)
            .map(|(i, _)| i as u32)
            .collect();
    }

    let mut polytope = Polytope {
        vertices,
        ..Default::default()
    };
    for (plane, mut face) in planes.iter().zip(on_plane) {
        if face.len() < 3 {
            continue;
        }
        wind(&mut face, &polytope.vertices, plane.normal);
        polytope.faces.push(face);
        polytope.face_planes.push(plane.clone());
    }
    polytope
}
