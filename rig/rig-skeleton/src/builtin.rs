//! Built-in template skeletons.
//!
//! The four stock skeletons are data tables consumed by one constructor;
//! joint order within a table is parent-before-child and is significant
//! because joint indices appear in the persisted outputs.

use nalgebra::Point3;

use crate::skeleton::{Skeleton, SkeletonBuilder};

/// One row of a skeleton table.
struct JointDef {
    name: &'static str,
    position: [f64; 3],
    parent: Option<&'static str>,
}

/// A complete built-in skeleton description.
struct SkeletonTable {
    joints: &'static [JointDef],
    symmetric: &'static [(&'static str, &'static str)],
    feet: &'static [&'static str],
    fat: &'static [&'static str],
}

macro_rules! joint {
    ($name:literal, [$x:expr, $y:expr, $z:expr]) => {
        JointDef {
            name: $name,
            position: [$x, $y, $z],
            parent: None,
        }
    };
    ($name:literal, [$x:expr, $y:expr, $z:expr], $parent:literal) => {
        JointDef {
            name: $name,
            position: [$x, $y, $z],
            parent: Some($parent),
        }
    };
}

static HUMAN: SkeletonTable = SkeletonTable {
    joints: &[
        joint!("shoulders", [0.0, 0.5, 0.0]),
        joint!("back", [0.0, 0.15, 0.0], "shoulders"),
        joint!("hips", [0.0, 0.0, 0.0], "back"),
        joint!("head", [0.0, 0.7, 0.0], "shoulders"),
        joint!("lthigh", [-0.1, 0.0, 0.0], "hips"),
        joint!("lknee", [-0.15, -0.35, 0.0], "lthigh"),
        joint!("lankle", [-0.15, -0.8, 0.0], "lknee"),
        joint!("lfoot", [-0.15, -0.8, 0.1], "lankle"),
        joint!("rthigh", [0.1, 0.0, 0.0], "hips"),
        joint!("rknee", [0.15, -0.35, 0.0], "rthigh"),
        joint!("rankle", [0.15, -0.8, 0.0], "rknee"),
        joint!("rfoot", [0.15, -0.8, 0.1], "rankle"),
        joint!("lshoulder", [-0.2, 0.5, 0.0], "shoulders"),
        joint!("lelbow", [-0.4, 0.25, 0.075], "lshoulder"),
        joint!("lhand", [-0.6, 0.0, 0.15], "lelbow"),
        joint!("rshoulder", [0.2, 0.5, 0.0], "shoulders"),
        joint!("relbow", [0.4, 0.25, 0.075], "rshoulder"),
        joint!("rhand", [0.6, 0.0, 0.15], "relbow"),
    ],
    symmetric: &[
        ("lthigh", "rthigh"),
        ("lknee", "rknee"),
        ("lankle", "rankle"),
        ("lfoot", "rfoot"),
        ("lshoulder", "rshoulder"),
        ("lelbow", "relbow"),
        ("lhand", "rhand"),
    ],
    feet: &["lfoot", "rfoot"],
    fat: &["hips", "shoulders", "head"],
};

static QUAD: SkeletonTable = SkeletonTable {
    joints: &[
        joint!("shoulders", [0.0, 0.0, 0.5]),
        joint!("back", [0.0, 0.0, 0.0], "shoulders"),
        joint!("hips", [0.0, 0.0, -0.5], "back"),
        joint!("neck", [0.0, 0.2, 0.63], "shoulders"),
        joint!("head", [0.0, 0.2, 0.9], "neck"),
        joint!("lthigh", [-0.15, 0.0, -0.5], "hips"),
        joint!("lhknee", [-0.2, -0.4, -0.5], "lthigh"),
        joint!("lhfoot", [-0.2, -0.8, -0.5], "lhknee"),
        joint!("rthigh", [0.15, 0.0, -0.5], "hips"),
        joint!("rhknee", [0.2, -0.4, -0.5], "rthigh"),
        joint!("rhfoot", [0.2, -0.8, -0.5], "rhknee"),
        joint!("lshoulder", [-0.2, 0.0, 0.5], "shoulders"),
        joint!("lfknee", [-0.2, -0.4, 0.5], "lshoulder"),
        joint!("lffoot", [-0.2, -0.8, 0.5], "lfknee"),
        joint!("rshoulder", [0.2, 0.0, 0.5], "shoulders"),
        joint!("rfknee", [0.2, -0.4, 0.5], "rshoulder"),
        joint!("rffoot", [0.2, -0.8, 0.5], "rfknee"),
        joint!("tail", [0.0, 0.0, -0.7], "hips"),
    ],
    symmetric: &[
        ("lthigh", "rthigh"),
        ("lhknee", "rhknee"),
        ("lhfoot", "rhfoot"),
        ("lshoulder", "rshoulder"),
        ("lfknee", "rfknee"),
        ("lffoot", "rffoot"),
    ],
    feet: &["lhfoot", "rhfoot", "lffoot", "rffoot"],
    fat: &["hips", "shoulders", "head"],
};

static HORSE: SkeletonTable = SkeletonTable {
    joints: &[
        joint!("shoulders", [0.0, 0.0, 0.5]),
        joint!("back", [0.0, 0.0, 0.0], "shoulders"),
        joint!("hips", [0.0, 0.0, -0.5], "back"),
        joint!("neck", [0.0, 0.2, 0.63], "shoulders"),
        joint!("head", [0.0, 0.2, 0.9], "neck"),
        joint!("lthigh", [-0.15, 0.0, -0.5], "hips"),
        joint!("lhknee", [-0.2, -0.2, -0.45], "lthigh"),
        joint!("lhheel", [-0.2, -0.4, -0.5], "lhknee"),
        joint!("lhfoot", [-0.2, -0.8, -0.5], "lhheel"),
        joint!("rthigh", [0.15, 0.0, -0.5], "hips"),
        joint!("rhknee", [0.2, -0.2, -0.45], "rthigh"),
        joint!("rhheel", [0.2, -0.4, -0.5], "rhknee"),
        joint!("rhfoot", [0.2, -0.8, -0.5], "rhheel"),
        joint!("lshoulder", [-0.2, 0.0, 0.5], "shoulders"),
        joint!("lfknee", [-0.2, -0.4, 0.5], "lshoulder"),
        joint!("lffoot", [-0.2, -0.8, 0.5], "lfknee"),
        joint!("rshoulder", [0.2, 0.0, 0.5], "shoulders"),
        joint!("rfknee", [0.2, -0.4, 0.5], "rshoulder"),
        joint!("rffoot", [0.2, -0.8, 0.5], "rfknee"),
        joint!("tail", [0.0, 0.0, -0.7], "hips"),
    ],
    symmetric: &[
        ("lthigh", "rthigh"),
        ("lhknee", "rhknee"),
        ("lhheel", "rhheel"),
        ("lhfoot", "rhfoot"),
        ("lshoulder", "rshoulder"),
        ("lfknee", "rfknee"),
        ("lffoot", "rffoot"),
    ],
    feet: &["lhfoot", "rhfoot", "lffoot", "rffoot"],
    fat: &["hips", "shoulders", "head"],
};

static CENTAUR: SkeletonTable = SkeletonTable {
    joints: &[
        joint!("shoulders", [0.0, 0.0, 0.5]),
        joint!("back", [0.0, 0.0, 0.0], "shoulders"),
        joint!("hips", [0.0, 0.0, -0.5], "back"),
        joint!("hback", [0.0, 0.25, 0.5], "shoulders"),
        joint!("hshoulders", [0.0, 0.5, 0.5], "hback"),
        joint!("head", [0.0, 0.7, 0.5], "hshoulders"),
        joint!("lthigh", [-0.15, 0.0, -0.5], "hips"),
        joint!("lhknee", [-0.2, -0.4, -0.45], "lthigh"),
        joint!("lhfoot", [-0.2, -0.8, -0.5], "lhknee"),
        joint!("rthigh", [0.15, 0.0, -0.5], "hips"),
        joint!("rhknee", [0.2, -0.4, -0.45], "rthigh"),
        joint!("rhfoot", [0.2, -0.8, -0.5], "rhknee"),
        joint!("lshoulder", [-0.2, 0.0, 0.5], "shoulders"),
        joint!("lfknee", [-0.2, -0.4, 0.5], "lshoulder"),
        joint!("lffoot", [-0.2, -0.8, 0.5], "lfknee"),
        joint!("rshoulder", [0.2, 0.0, 0.5], "shoulders"),
        joint!("rfknee", [0.2, -0.4, 0.5], "rshoulder"),
        joint!("rffoot", [0.2, -0.8, 0.5], "rfknee"),
        joint!("hlshoulder", [-0.2, 0.5, 0.5], "hshoulders"),
        joint!("lelbow", [-0.4, 0.25, 0.575], "hlshoulder"),
        joint!("lhand", [-0.6, 0.0, 0.65], "lelbow"),
        joint!("hrshoulder", [0.2, 0.5, 0.5], "hshoulders"),
        joint!("relbow", [0.4, 0.25, 0.575], "hrshoulder"),
        joint!("rhand", [0.6, 0.0, 0.65], "relbow"),
        joint!("tail", [0.0, 0.0, -0.7], "hips"),
    ],
    symmetric: &[
        ("lthigh", "rthigh"),
        ("lhknee", "rhknee"),
        ("lhfoot", "rhfoot"),
        ("lshoulder", "rshoulder"),
        ("lfknee", "rfknee"),
        ("lffoot", "rffoot"),
        ("hlshoulder", "hrshoulder"),
        ("lelbow", "relbow"),
        ("lhand", "rhand"),
    ],
    feet: &["lhfoot", "rhfoot", "lffoot", "rffoot"],
    fat: &["hips", "shoulders", "hshoulders", "head"],
};

fn from_table(table: &'static SkeletonTable) -> Skeleton {
    let mut builder = SkeletonBuilder::new();
    for j in table.joints {
        builder = builder.joint(
            j.name,
            Point3::new(j.position[0], j.position[1], j.position[2]),
            j.parent,
        );
    }
    for (a, b) in table.symmetric {
        builder = builder.symmetric(a, b);
    }
    for name in table.feet {
        builder = builder.foot(name);
    }
    for name in table.fat {
        builder = builder.fat(name);
    }
    match builder.build() {
        Ok(skeleton) => skeleton,
        // the tables are static and validated by tests; a bad one is a bug
        Err(e) => unreachable!("invalid built-in skeleton table: {e}"),
    }
}

impl Skeleton {
    /// The built-in biped skeleton (18 joints).
    #[must_use]
    pub fn human() -> Self {
        from_table(&HUMAN)
    }

    /// The built-in quadruped skeleton.
    #[must_use]
    pub fn quad() -> Self {
        from_table(&QUAD)
    }

    /// The built-in horse skeleton (quadruped with heel joints).
    #[must_use]
    pub fn horse() -> Self {
        from_table(&HORSE)
    }

    /// The built-in centaur skeleton (quadruped body, biped torso).
    #[must_use]
    pub fn centaur() -> Self {
        from_table(&CENTAUR)
    }

    /// Look up a built-in skeleton by name.
    #[must_use]
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "human" => Some(Self::human()),
            "quad" => Some(Self::quad()),
            "horse" => Some(Self::horse()),
            "centaur" => Some(Self::centaur()),
            _ => None,
        }
    }
}
