//! Entities module - users, entities, vouches and the raw judgements they make

use std::collections::{BTreeMap, BTreeSet};

use crate::table::{format_float, parse_float, MultiKeyTable, TableValue};

/// A contributor
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// Unique username
    pub username: String,

    /// Trust in [0, 1], computed upstream by trust propagation
    pub trust: f64,

    /// Whether the user was trusted before propagation
    pub is_pretrusted: bool,
}

impl User {
    /// Create a new user
    pub fn new(username: impl Into<String>, trust: f64, is_pretrusted: bool) -> Self {
        Self {
            username: username.into(),
            trust,
            is_pretrusted,
        }
    }
}

/// All contributors, keyed by username
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Users {
    users: BTreeMap<String, User>,
}

impl Users {
    /// Create an empty set of users
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user
    pub fn insert(&mut self, user: User) {
        self.users.insert(user.username.clone(), user);
    }

    /// Get a user by name
    pub fn get(&self, username: &str) -> Option<&User> {
        self.users.get(username)
    }

    /// Trust of a user; 0 for unknown users and NaN trust
    ///
    /// # Examples
    ///
    /// ```
    /// use concord_domain::{User, Users};
    ///
    /// let mut users = Users::new();
    /// users.insert(User::new("alice", 0.8, true));
    /// users.insert(User::new("bob", f64::NAN, false));
    /// assert_eq!(users.trust("alice"), 0.8);
    /// assert_eq!(users.trust("bob"), 0.0);
    /// assert_eq!(users.trust("carol"), 0.0);
    /// ```
    pub fn trust(&self, username: &str) -> f64 {
        match self.users.get(username) {
            Some(user) if user.trust.is_finite() => user.trust,
            _ => 0.0,
        }
    }

    /// Iterate over users in username order
    pub fn iter(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    /// All usernames, sorted
    pub fn usernames(&self) -> Vec<&str> {
        self.users.keys().map(|k| k.as_str()).collect()
    }

    /// Number of users
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether there is no user
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl FromIterator<User> for Users {
    fn from_iter<I: IntoIterator<Item = User>>(iter: I) -> Self {
        let mut users = Users::new();
        for user in iter {
            users.insert(user);
        }
        users
    }
}

/// Names of the items being scored
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Entities {
    names: BTreeSet<String>,
}

impl Entities {
    /// Create an empty set of entities
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, returning false if it was already known
    pub fn insert(&mut self, entity_name: impl Into<String>) -> bool {
        self.names.insert(entity_name.into())
    }

    /// Whether the entity is known
    pub fn contains(&self, entity_name: &str) -> bool {
        self.names.contains(entity_name)
    }

    /// Iterate over entity names in order
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.names.iter()
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether there is no entity
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A directed vouch from one user to another
#[derive(Debug, Clone, PartialEq)]
pub struct Vouch {
    /// Voucher
    pub by: String,
    /// Vouchee
    pub to: String,
    /// Kind of vouch (e.g. "personhood")
    pub kind: String,
    /// Weight in (0, 1]
    pub weight: f64,
    /// Priority among vouches of the same voucher
    pub priority: f64,
}

/// A single pairwise judgement
///
/// `value < 0` means the left entity is preferred.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Comparison value in [-max, max]
    pub value: f64,
    /// Bound of the comparison scale (> 0)
    pub max: f64,
}

impl Comparison {
    /// Create a comparison, validating its range
    pub fn new(value: f64, max: f64) -> Result<Self, String> {
        if max.is_nan() || max <= 0.0 || max.is_infinite() {
            return Err(format!("Comparison max must be positive, got {}", max));
        }
        if !value.is_finite() || value.abs() > max {
            return Err(format!("Comparison value {} outside [-{}, {}]", value, max, max));
        }
        Ok(Self { value, max })
    }

    /// Normalized comparison `-value / max` in [-1, 1]
    ///
    /// Positive when the left entity is preferred.
    pub fn normalized(&self) -> f64 {
        -self.value / self.max
    }

    /// The same judgement with left and right swapped
    pub fn reversed(&self) -> Self {
        Self {
            value: -self.value,
            max: self.max,
        }
    }
}

impl TableValue for Comparison {
    fn value_names() -> Vec<&'static str> {
        vec!["value", "max"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![format_float(self.value), format_float(self.max)]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [value, max] => Comparison::new(parse_float(value)?, parse_float(max)?),
            _ => Err(format!("Expected 2 fields, got {}", fields.len())),
        }
    }
}

/// Pairwise comparisons keyed by `(username, criterion, left_name, right_name)`
///
/// At most one comparison is kept per user, criterion and unordered pair:
/// the last one added wins.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparisons {
    table: MultiKeyTable<Comparison>,
}

impl Default for Comparisons {
    fn default() -> Self {
        Self::new()
    }
}

impl Comparisons {
    /// Key names of the underlying table
    pub const KEYNAMES: [&'static str; 4] = ["username", "criterion", "left_name", "right_name"];

    /// Create an empty set of comparisons
    pub fn new() -> Self {
        Self {
            table: MultiKeyTable::new(&Self::KEYNAMES),
        }
    }

    /// Record a comparison, replacing any earlier one on the same pair
    ///
    /// An earlier comparison stored in the opposite orientation keeps its
    /// orientation and takes the new value with its sign flipped.
    pub fn add(&mut self, username: &str, criterion: &str, left: &str, right: &str, comparison: Comparison) {
        let reversed = [username, criterion, right, left];
        if self.table.get(&reversed).is_some() {
            self.table.insert(&reversed, comparison.reversed());
        } else {
            self.table.insert(&[username, criterion, left, right], comparison);
        }
    }

    /// All comparisons as `(keys, comparison)` rows
    pub fn iter(&self) -> Vec<(Vec<String>, &Comparison)> {
        self.table.iter()
    }

    /// Comparisons of one user on one criterion, as `(left, right, comparison)`
    pub fn for_user_criterion(&self, username: &str, criterion: &str) -> Vec<(String, String, Comparison)> {
        self.table
            .filter(&[("username", username), ("criterion", criterion)])
            .iter()
            .into_iter()
            .map(|(keys, c)| (keys[2].clone(), keys[3].clone(), *c))
            .collect()
    }

    /// All criteria with at least one comparison
    pub fn criteria(&self) -> BTreeSet<String> {
        self.table.keys("criterion")
    }

    /// Users with at least one comparison on `criterion`
    pub fn evaluators(&self, criterion: &str) -> BTreeSet<String> {
        self.table.filter(&[("criterion", criterion)]).keys("username")
    }

    /// Every entity named on either side of a comparison
    pub fn entity_names(&self) -> BTreeSet<String> {
        let mut names = self.table.keys("left_name");
        names.extend(self.table.keys("right_name"));
        names
    }

    /// Index the comparisons by criterion
    pub fn cache_by_criterion(&mut self) -> Result<(), String> {
        self.table.cache(&["criterion"])
    }

    /// Underlying table
    pub fn table(&self) -> &MultiKeyTable<Comparison> {
        &self.table
    }

    /// Number of stored comparisons
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether there is no comparison
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// A direct numeric judgement of one entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Assessment {
    /// Assessed value
    pub value: f64,
    /// Lower bound of the assessment scale
    pub min: f64,
    /// Upper bound of the assessment scale
    pub max: f64,
}

impl TableValue for Assessment {
    fn value_names() -> Vec<&'static str> {
        vec!["value", "min", "max"]
    }

    fn to_fields(&self) -> Vec<String> {
        vec![format_float(self.value), format_float(self.min), format_float(self.max)]
    }

    fn from_fields(fields: &[&str]) -> Result<Self, String> {
        match fields {
            [value, min, max] => Ok(Self {
                value: parse_float(value)?,
                min: parse_float(min)?,
                max: parse_float(max)?,
            }),
            _ => Err(format!("Expected 3 fields, got {}", fields.len())),
        }
    }
}

/// Assessments keyed by `(username, criterion, entity_name)`
pub type Assessments = MultiKeyTable<Assessment>;

/// Key names of [`Assessments`]
pub const ASSESSMENT_KEYNAMES: [&str; 3] = ["username", "criterion", "entity_name"];

/// Whether each user made each rating public
#[derive(Debug, Clone, PartialEq)]
pub struct MadePublic {
    table: MultiKeyTable<bool>,
    default_public: bool,
}

impl MadePublic {
    /// Key names of the underlying table
    pub const KEYNAMES: [&'static str; 2] = ["username", "entity_name"];

    /// Every rating is public
    pub fn all_public() -> Self {
        Self {
            table: MultiKeyTable::new(&Self::KEYNAMES),
            default_public: true,
        }
    }

    /// Explicit flags; ratings without a flag are private
    pub fn from_table(table: MultiKeyTable<bool>) -> Self {
        Self {
            table,
            default_public: false,
        }
    }

    /// Set the flag of one rating
    pub fn set(&mut self, username: &str, entity_name: &str, public: bool) {
        self.table.insert(&[username, entity_name], public);
    }

    /// Whether a rating is public
    pub fn is_public(&self, username: &str, entity_name: &str) -> bool {
        self.table
            .get(&[username, entity_name])
            .copied()
            .unwrap_or(self.default_public)
    }

    /// 1 for public ratings, `privacy_penalty` for private ones
    pub fn penalty(&self, privacy_penalty: f64, username: &str, entity_name: &str) -> f64 {
        if self.is_public(username, entity_name) {
            1.0
        } else {
            privacy_penalty
        }
    }

    /// Whether absent ratings count as public
    pub fn default_public(&self) -> bool {
        self.default_public
    }

    /// Underlying table
    pub fn table(&self) -> &MultiKeyTable<bool> {
        &self.table
    }
}

impl Default for MadePublic {
    fn default() -> Self {
        Self::all_public()
    }
}
