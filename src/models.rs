use std::fmt;

/// Integer pixel coordinate, `x` is the column and `y` the row (row 0 at the top)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelPoint {
    pub x: i64,
    pub y: i64,
}

impl PixelPoint {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for PixelPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One tagged source image: where its optic nerve and macula are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LandmarkRecord {
    /// File name of the photograph as written in the landmark table
    pub image_ref: String,
    pub nerve: PixelPoint,
    pub macula: PixelPoint,
}

impl LandmarkRecord {
    pub fn new(image_ref: impl Into<String>, nerve: PixelPoint, macula: PixelPoint) -> Self {
        Self {
            image_ref: image_ref.into(),
            nerve,
            macula,
        }
    }

    /// Right eyes have the nerve to the right of the macula.
    pub fn eye(&self) -> Eye {
        if self.nerve.x > self.macula.x {
            Eye::Right
        } else {
            Eye::Left
        }
    }
}

/// Laterality of a single photograph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Right,
    Left,
}

/// One of the three accumulated views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Right,
    Left,
    /// Both eyes, left eyes mirrored into right-eye orientation
    Composite,
}

impl Side {
    /// Output order: right, left, composite.
    pub const ALL: [Side; 3] = [Side::Right, Side::Left, Side::Composite];

    /// Label used in artifact file names
    pub fn file_label(self) -> &'static str {
        match self {
            Side::Right => "right",
            Side::Left => "left",
            Side::Composite => "both",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Side::Right => "right",
            Side::Left => "left",
            Side::Composite => "composite",
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Side::Right => 0,
            Side::Left => 1,
            Side::Composite => 2,
        }
    }
}

impl From<Eye> for Side {
    fn from(eye: Eye) -> Self {
        match eye {
            Eye::Right => Side::Right,
            Eye::Left => Side::Left,
        }
    }
}

/// An annotated condition or vessel type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    /// Short code, also the label sub-directory name (e.g. "EX")
    pub code: String,
    pub name: String,
}

impl Condition {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// A canvas category: one condition, or the sum of all of them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Condition(usize),
    All,
}

/// Ordered list of conditions plus the synthetic aggregate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySet {
    conditions: Vec<Condition>,
    aggregate: Condition,
}

impl CategorySet {
    pub fn new(conditions: Vec<Condition>, aggregate: Condition) -> Self {
        Self {
            conditions,
            aggregate,
        }
    }

    /// Diabetic retinopathy lesion labels
    pub fn retinopathy() -> Self {
        let conditions = [
            ("EX", "Exudates"),
            ("HE", "Haemorrhages"),
            ("MA", "Microaneurysms"),
            ("SE", "Cotton Wool Spots"),
            ("IRH", "Intraretinal Haemorrhages"),
            ("IRMA", "Intraretinal Microvascular Abnormalities"),
            ("NV", "Neovascularisation"),
            ("NVD", "New Vessels at the Disc"),
            ("NVE", "New Vessels Elsewhere"),
            ("VB", "Venous Beading"),
        ]
        .into_iter()
        .map(|(code, name)| Condition::new(code, name))
        .collect();

        Self::new(conditions, Condition::new("ALL", "All Retinopathy"))
    }

    /// Arteriole / venule labels
    pub fn vessels() -> Self {
        Self::new(
            vec![
                Condition::new("A", "Arterioles"),
                Condition::new("V", "Venules"),
            ],
            Condition::new("ALL_AV", "All Vessels"),
        )
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Number of categories including the aggregate
    pub fn count(&self) -> usize {
        self.conditions.len() + 1
    }

    /// Conditions first in declaration order, then [`Category::All`]
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        (0..self.conditions.len())
            .map(Category::Condition)
            .chain(std::iter::once(Category::All))
    }

    pub fn condition(&self, category: Category) -> &Condition {
        match category {
            Category::Condition(index) => &self.conditions[index],
            Category::All => &self.aggregate,
        }
    }

    pub(crate) fn slot(&self, category: Category) -> usize {
        match category {
            Category::Condition(index) => {
                assert!(index < self.conditions.len(), "unknown condition {index}");
                index
            }
            Category::All => self.conditions.len(),
        }
    }
}
