//! Static arena geometry
//!
//! Fields are built from bounded planes: each plane faces into the playable
//! volume and only applies inside an axis-aligned region, which is how goal
//! mouths are cut out of the back walls. Hoops adds a basket under each rim
//! that only the ball collides with. The geometry for a mode is built once
//! and shared read-only between every arena and thread.

use std::sync::{Arc, OnceLock};

use glam::{Vec2, Vec3A};

use super::collision::CollisionResult;
use super::state::GameMode;
use crate::consts::*;

/// Slack for region tests on ray hits and contact points
const REGION_EPS: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundedPlane {
    /// Unit normal pointing into the playable volume
    pub normal: Vec3A,
    /// Points with `normal.dot(p) >= offset` are on the open side
    pub offset: f32,
    pub region_min: Vec3A,
    pub region_max: Vec3A,
}

impl BoundedPlane {
    fn unbounded(normal: Vec3A, offset: f32) -> Self {
        Self {
            normal,
            offset,
            region_min: Vec3A::splat(f32::NEG_INFINITY),
            region_max: Vec3A::splat(f32::INFINITY),
        }
    }

    fn bounded(normal: Vec3A, offset: f32, region_min: Vec3A, region_max: Vec3A) -> Self {
        Self {
            normal,
            offset,
            region_min,
            region_max,
        }
    }

    #[inline]
    pub fn signed_dist(&self, p: Vec3A) -> f32 {
        self.normal.dot(p) - self.offset
    }

    #[inline]
    pub fn applies_to(&self, p: Vec3A) -> bool {
        let eps = Vec3A::splat(REGION_EPS);
        p.cmpge(self.region_min - eps).all() && p.cmple(self.region_max + eps).all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub dist: f32,
    pub point: Vec3A,
    pub normal: Vec3A,
}

/// Hoop basket: a vertical cylinder open at the rim with a net floor
///
/// Everything below the net floor is a solid post down to the ground, so the
/// ball can only reach the net by dropping through the rim.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoopNet {
    pub center_x: f32,
    pub center_y: f32,
    pub radius: f32,
    pub floor_z: f32,
    pub rim_z: f32,
}

impl HoopNet {
    fn for_side(side: f32) -> Self {
        Self {
            center_x: 0.0,
            center_y: side * HOOPS_NET_CENTER_Y,
            radius: HOOPS_NET_RADIUS,
            floor_z: HOOPS_NET_FLOOR_Z,
            rim_z: HOOPS_RIM_Z,
        }
    }

    /// Up to two surfaces a sphere touches: a wall, the rim or post, and the net floor
    pub fn sphere_contacts(&self, center: Vec3A, radius: f32) -> [Option<CollisionResult>; 2] {
        let offset = Vec2::new(center.x - self.center_x, center.y - self.center_y);
        let d = offset.length();
        // Dead center under the rim, leave toward the field
        let outward = if d > 1e-4 {
            Vec3A::new(offset.x / d, offset.y / d, 0.0)
        } else {
            Vec3A::new(0.0, -self.center_y.signum(), 0.0)
        };
        let ring_point = |z: f32| {
            Vec3A::new(self.center_x, self.center_y, z) + outward * self.radius
        };
        let contact = |normal: Vec3A, gap: f32| CollisionResult {
            hit: true,
            point: center - normal * gap,
            normal,
            penetration: radius - gap,
        };

        let mut out = [None, None];
        if center.z >= self.rim_z {
            // Lip of the rim
            let delta = center - ring_point(self.rim_z);
            let gap = delta.length();
            if gap < radius && gap > 1e-4 {
                out[0] = Some(contact(delta / gap, gap));
            }
        } else if d >= self.radius {
            let gap = d - self.radius;
            if gap < radius {
                out[0] = Some(contact(outward, gap));
            }
        } else if center.z >= self.floor_z {
            let wall_gap = self.radius - d;
            if wall_gap < radius {
                out[0] = Some(contact(-outward, wall_gap));
            }
            let floor_gap = center.z - self.floor_z;
            if floor_gap < radius {
                out[1] = Some(contact(Vec3A::Z, floor_gap));
            }
        } else {
            // Inside the post, push out sideways
            out[0] = Some(CollisionResult {
                hit: true,
                point: ring_point(center.z),
                normal: outward,
                penetration: self.radius - d + radius,
            });
        }
        out
    }
}

/// Collision geometry for one game mode
#[derive(Debug, Clone, PartialEq)]
pub struct ArenaGeometry {
    pub game_mode: GameMode,
    planes: Vec<BoundedPlane>,
    nets: Vec<HoopNet>,
}

impl ArenaGeometry {
    /// Shared, lazily built geometry for a game mode
    pub fn shared(game_mode: GameMode) -> Arc<ArenaGeometry> {
        static CACHE: OnceLock<Vec<Arc<ArenaGeometry>>> = OnceLock::new();
        let all = CACHE.get_or_init(|| {
            GameMode::ALL
                .iter()
                .map(|&mode| Arc::new(ArenaGeometry::build(mode)))
                .collect()
        });
        Arc::clone(&all[game_mode as usize])
    }

    pub fn build(game_mode: GameMode) -> Self {
        let planes = match game_mode {
            GameMode::Soccar | GameMode::Heatseeker | GameMode::Snowday => soccar_planes(),
            GameMode::Hoops => closed_box_planes(
                ARENA_EXTENT_X_HOOPS,
                ARENA_EXTENT_Y_HOOPS,
                0.0,
                ARENA_HEIGHT_HOOPS,
                ARENA_CORNER_CUT_HOOPS,
            ),
            GameMode::Dropshot => closed_box_planes(
                ARENA_EXTENT_X_DROPSHOT,
                ARENA_EXTENT_Y_DROPSHOT,
                FLOOR_HEIGHT_DROPSHOT,
                ARENA_HEIGHT_DROPSHOT,
                ARENA_CORNER_CUT_DROPSHOT,
            ),
            GameMode::TheVoid => Vec::new(),
        };
        let nets = match game_mode {
            GameMode::Hoops => vec![HoopNet::for_side(-1.0), HoopNet::for_side(1.0)],
            _ => Vec::new(),
        };
        log::debug!(
            "Built {:?} geometry with {} planes and {} hoop nets",
            game_mode,
            planes.len(),
            nets.len()
        );
        Self {
            game_mode,
            planes,
            nets,
        }
    }

    pub fn planes(&self) -> &[BoundedPlane] {
        &self.planes
    }

    pub fn hoop_nets(&self) -> &[HoopNet] {
        &self.nets
    }

    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Closest surface hit along a unit direction within `max_dist`
    pub fn raycast(&self, origin: Vec3A, dir: Vec3A, max_dist: f32) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for plane in &self.planes {
            let denom = plane.normal.dot(dir);
            if denom >= -1e-6 {
                continue;
            }
            let t = -plane.signed_dist(origin) / denom;
            if !(0.0..=max_dist).contains(&t) {
                continue;
            }
            if best.is_some_and(|b| b.dist <= t) {
                continue;
            }
            let point = origin + dir * t;
            if plane.applies_to(point) {
                best = Some(RayHit {
                    dist: t,
                    point,
                    normal: plane.normal,
                });
            }
        }
        best
    }

    /// Every surface a sphere overlaps, hoop nets included
    pub fn sphere_contacts(
        &self,
        center: Vec3A,
        radius: f32,
    ) -> impl Iterator<Item = CollisionResult> + '_ {
        let planes = self.planes.iter().filter_map(move |plane| {
            if !plane.applies_to(center) {
                return None;
            }
            let dist = plane.signed_dist(center);
            (dist < radius).then(|| CollisionResult {
                hit: true,
                point: center - plane.normal * dist,
                normal: plane.normal,
                penetration: radius - dist,
            })
        });
        let nets = self
            .nets
            .iter()
            .flat_map(move |net| net.sphere_contacts(center, radius))
            .flatten();
        planes.chain(nets)
    }

    /// Deepest penetration of a point set into each surface
    pub fn point_contacts<'a>(
        &'a self,
        points: &'a [Vec3A],
    ) -> impl Iterator<Item = CollisionResult> + 'a {
        self.planes.iter().filter_map(move |plane| {
            let mut deepest: Option<(f32, Vec3A)> = None;
            for &p in points {
                let dist = plane.signed_dist(p);
                if dist < 0.0 && plane.applies_to(p) && deepest.is_none_or(|(d, _)| dist < d) {
                    deepest = Some((dist, p));
                }
            }
            deepest.map(|(dist, p)| CollisionResult {
                hit: true,
                point: p,
                normal: plane.normal,
                penetration: -dist,
            })
        })
    }
}

fn floor_and_ceiling(floor: f32, height: f32) -> [BoundedPlane; 2] {
    [
        BoundedPlane::unbounded(Vec3A::Z, floor),
        BoundedPlane::unbounded(Vec3A::NEG_Z, -height),
    ]
}

fn side_walls(extent_x: f32) -> [BoundedPlane; 2] {
    [
        BoundedPlane::unbounded(Vec3A::X, -extent_x),
        BoundedPlane::unbounded(Vec3A::NEG_X, -extent_x),
    ]
}

/// 45 degree planes that cut `cut` off each corner along both axes
fn corner_planes(extent_x: f32, extent_y: f32, cut: f32) -> impl Iterator<Item = BoundedPlane> {
    let reach = extent_x + extent_y - cut;
    [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]
        .into_iter()
        .map(move |(sx, sy)| {
            let normal = Vec3A::new(-sx, -sy, 0.0).normalize();
            BoundedPlane::unbounded(normal, -reach * std::f32::consts::FRAC_1_SQRT_2)
        })
}

fn closed_box_planes(
    extent_x: f32,
    extent_y: f32,
    floor: f32,
    height: f32,
    cut: f32,
) -> Vec<BoundedPlane> {
    let mut planes = Vec::new();
    planes.extend(floor_and_ceiling(floor, height));
    planes.extend(side_walls(extent_x));
    planes.push(BoundedPlane::unbounded(Vec3A::Y, -extent_y));
    planes.push(BoundedPlane::unbounded(Vec3A::NEG_Y, -extent_y));
    planes.extend(corner_planes(extent_x, extent_y, cut));
    planes
}

fn soccar_planes() -> Vec<BoundedPlane> {
    const INF: f32 = f32::INFINITY;
    let mut planes = Vec::new();
    planes.extend(floor_and_ceiling(0.0, ARENA_HEIGHT));
    planes.extend(side_walls(ARENA_EXTENT_X));
    planes.extend(corner_planes(ARENA_EXTENT_X, ARENA_EXTENT_Y, ARENA_CORNER_CUT));

    for side in [1.0f32, -1.0] {
        let wall_normal = Vec3A::new(0.0, -side, 0.0);
        let (y_min, y_max) = if side > 0.0 {
            (ARENA_EXTENT_Y, INF)
        } else {
            (-INF, -ARENA_EXTENT_Y)
        };

        // Back wall around the goal mouth
        planes.push(BoundedPlane::bounded(
            wall_normal,
            -ARENA_EXTENT_Y,
            Vec3A::splat(-INF),
            Vec3A::new(-GOAL_HALF_WIDTH, INF, INF),
        ));
        planes.push(BoundedPlane::bounded(
            wall_normal,
            -ARENA_EXTENT_Y,
            Vec3A::new(GOAL_HALF_WIDTH, -INF, -INF),
            Vec3A::splat(INF),
        ));
        planes.push(BoundedPlane::bounded(
            wall_normal,
            -ARENA_EXTENT_Y,
            Vec3A::new(-GOAL_HALF_WIDTH, -INF, GOAL_HEIGHT),
            Vec3A::new(GOAL_HALF_WIDTH, INF, INF),
        ));

        // Goal box
        let region_min = Vec3A::new(-INF, y_min, -INF);
        let region_max = Vec3A::new(INF, y_max, INF);
        planes.push(BoundedPlane::bounded(
            Vec3A::NEG_X,
            -GOAL_HALF_WIDTH,
            region_min,
            region_max,
        ));
        planes.push(BoundedPlane::bounded(
            Vec3A::X,
            -GOAL_HALF_WIDTH,
            region_min,
            region_max,
        ));
        planes.push(BoundedPlane::bounded(
            Vec3A::NEG_Z,
            -GOAL_HEIGHT,
            region_min,
            region_max,
        ));
        planes.push(BoundedPlane::unbounded(
            wall_normal,
            -(ARENA_EXTENT_Y + GOAL_DEPTH),
        ));
    }

    planes
}
