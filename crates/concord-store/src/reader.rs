//! Loading an input directory into a [`State`]

use std::path::{Path, PathBuf};

use concord_domain::table::{parse_bool, parse_float};
use concord_domain::{
    Assessment, Comparison, Comparisons, MadePublic, MultiKeyTable, State, TableValue, User, Users, Vouch,
    ASSESSMENT_KEYNAMES,
};
use tracing::{debug, info};

use crate::StoreError;

/// Required contributor file
pub const USERS_FILE: &str = "users.csv";
/// Required comparisons file
pub const COMPARISONS_FILE: &str = "comparisons.csv";
/// Optional public flags; absent means every rating is public
pub const MADE_PUBLIC_FILE: &str = "made_public.csv";
/// Optional entity list
pub const ENTITIES_FILE: &str = "entities.csv";
/// Optional vouches
pub const VOUCHES_FILE: &str = "vouches.csv";
/// Optional direct assessments
pub const ASSESSMENTS_FILE: &str = "assessments.csv";

/// A directory of contributor inputs
///
/// Column order is free and unknown columns are ignored. Every row is
/// checked while loading, so schema errors surface before any computation.
///
/// # Examples
///
/// ```no_run
/// use concord_store::InputDir;
///
/// let state = InputDir::new("data/inputs").load().unwrap();
/// println!("{} comparisons", state.comparisons.len());
/// ```
#[derive(Debug, Clone)]
pub struct InputDir {
    root: PathBuf,
}

impl InputDir {
    /// Input directory at `root`
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Directory path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load every input file into a fresh state
    pub fn load(&self) -> Result<State, StoreError> {
        let users = self.load_users()?;
        let comparisons = self.load_comparisons()?;
        let made_public = self.load_made_public()?;

        let mut state = State::from_inputs(users, comparisons, made_public);
        for entity_name in self.load_entities()? {
            state.entities.insert(entity_name);
        }
        state.vouches = self.load_vouches()?;
        state.assessments = self.load_assessments()?;

        info!(
            "Loaded {} users, {} entities, {} comparisons from {}",
            state.users.len(),
            state.entities.len(),
            state.comparisons.len(),
            self.root.display()
        );
        Ok(state)
    }

    /// `users.csv`: username, trust, is_pretrusted
    ///
    /// Trust lies in [0, 1]; an empty or NaN trust counts as 0.
    pub fn load_users(&self) -> Result<Users, StoreError> {
        let mut users = Users::new();
        read_rows(&self.required(USERS_FILE)?, &["username", "trust", "is_pretrusted"], |fields| {
            users.insert(User::new(fields[0], parse_trust(fields[1])?, parse_bool(fields[2])?));
            Ok(())
        })?;
        Ok(users)
    }

    /// `comparisons.csv`: username, criterion, left_name, right_name, value, max
    ///
    /// A later row on the same unordered pair replaces an earlier one.
    pub fn load_comparisons(&self) -> Result<Comparisons, StoreError> {
        let mut comparisons = Comparisons::new();
        read_rows(&self.required(COMPARISONS_FILE)?, &COMPARISON_COLUMNS, |fields| {
            let [username, criterion, left, right, value, max] = fields else {
                return Err(format!("Expected {} fields", COMPARISON_COLUMNS.len()));
            };
            if left == right {
                return Err(format!("'{}' is compared with itself", left));
            }
            let comparison = Comparison::new(parse_float(value)?, parse_float(max)?)?;
            comparisons.add(username, criterion, left, right, comparison);
            Ok(())
        })?;
        Ok(comparisons)
    }

    /// `made_public.csv`: username, entity_name, public
    pub fn load_made_public(&self) -> Result<MadePublic, StoreError> {
        match self.optional(MADE_PUBLIC_FILE) {
            Some(path) => Ok(MadePublic::from_table(read_table(&path, &MadePublic::KEYNAMES)?)),
            None => Ok(MadePublic::all_public()),
        }
    }

    /// `entities.csv`: entity_name
    pub fn load_entities(&self) -> Result<Vec<String>, StoreError> {
        let mut entities = Vec::new();
        if let Some(path) = self.optional(ENTITIES_FILE) {
            read_rows(&path, &["entity_name"], |fields| {
                entities.push(fields[0].to_string());
                Ok(())
            })?;
        }
        Ok(entities)
    }

    /// `vouches.csv`: by, to, kind, weight, priority
    pub fn load_vouches(&self) -> Result<Vec<Vouch>, StoreError> {
        let mut vouches = Vec::new();
        if let Some(path) = self.optional(VOUCHES_FILE) {
            read_rows(&path, &["by", "to", "kind", "weight", "priority"], |fields| {
                vouches.push(Vouch {
                    by: fields[0].to_string(),
                    to: fields[1].to_string(),
                    kind: fields[2].to_string(),
                    weight: parse_float(fields[3])?,
                    priority: parse_float(fields[4])?,
                });
                Ok(())
            })?;
        }
        Ok(vouches)
    }

    /// `assessments.csv`: username, criterion, entity_name, value, min, max
    pub fn load_assessments(&self) -> Result<MultiKeyTable<Assessment>, StoreError> {
        match self.optional(ASSESSMENTS_FILE) {
            Some(path) => read_table(&path, &ASSESSMENT_KEYNAMES),
            None => Ok(MultiKeyTable::new(&ASSESSMENT_KEYNAMES)),
        }
    }

    fn required(&self, file: &str) -> Result<PathBuf, StoreError> {
        self.optional(file)
            .ok_or_else(|| StoreError::MissingFile(self.root.join(file)))
    }

    fn optional(&self, file: &str) -> Option<PathBuf> {
        let path = self.root.join(file);
        if path.is_file() {
            Some(path)
        } else {
            debug!("No {} in {}", file, self.root.display());
            None
        }
    }
}

const COMPARISON_COLUMNS: [&str; 6] = ["username", "criterion", "left_name", "right_name", "value", "max"];

/// Read a flat table whose columns are `keynames` followed by `V`'s value names
pub fn read_table<V: TableValue>(path: &Path, keynames: &[&str]) -> Result<MultiKeyTable<V>, StoreError> {
    let mut columns: Vec<&str> = keynames.to_vec();
    columns.extend(V::value_names());

    let mut table = MultiKeyTable::new(keynames);
    read_rows(path, &columns, |fields| {
        let (keys, values) = fields.split_at(keynames.len());
        table.insert(keys, V::from_fields(values)?);
        Ok(())
    })?;
    Ok(table)
}

/// Call `row` with the fields of `columns`, in that order, for every record
fn read_rows<F>(path: &Path, columns: &[&str], mut row: F) -> Result<(), StoreError>
where
    F: FnMut(&[&str]) -> Result<(), String>,
{
    let file = file_name(path);
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let indices = columns
        .iter()
        .map(|column| {
            headers
                .iter()
                .position(|h| h == *column)
                .ok_or_else(|| StoreError::MissingColumn {
                    file: file.clone(),
                    column: column.to_string(),
                })
        })
        .collect::<Result<Vec<usize>, StoreError>>()?;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = indices.iter().map(|&i| record.get(i).unwrap_or("")).collect();
        row(&fields).map_err(|message| StoreError::InvalidValue {
            file: file.clone(),
            line,
            message,
        })?;
    }
    Ok(())
}

fn parse_trust(field: &str) -> Result<f64, String> {
    let trust = parse_float(field)?;
    if trust.is_nan() || (0.0..=1.0).contains(&trust) {
        Ok(trust)
    } else {
        Err(format!("trust must lie in [0, 1], got {}", field))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn input_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    const USERS: &str = "username,trust,is_pretrusted\nalice,1.0,true\nbob,,0\n";

    #[test]
    fn test_load_minimal_directory() {
        let dir = input_dir(&[
            (USERS_FILE, USERS),
            (
                COMPARISONS_FILE,
                "username,criterion,left_name,right_name,value,max\nalice,importance,a,b,-3,10\n",
            ),
        ]);
        let state = InputDir::new(dir.path()).load().unwrap();

        assert_eq!(state.users.len(), 2);
        assert_eq!(state.users.trust("alice"), 1.0);
        assert_eq!(state.users.trust("bob"), 0.0);
        assert_eq!(state.comparisons.len(), 1);
        assert_eq!(state.entities.len(), 2);
        assert!(state.made_public.is_public("alice", "a"));
        assert!(state.vouches.is_empty());
    }

    #[test]
    fn test_columns_in_any_order_and_extra_columns() {
        let dir = input_dir(&[
            (USERS_FILE, "note,is_pretrusted,trust,username\nx,True,0.5,alice\n"),
            (
                COMPARISONS_FILE,
                "max,value,right_name,left_name,criterion,username,comment\n10,2,b,a,importance,alice,hi\n",
            ),
        ]);
        let state = InputDir::new(dir.path()).load().unwrap();
        assert_eq!(state.users.trust("alice"), 0.5);
        assert!(state.users.get("alice").unwrap().is_pretrusted);
        let rows = state.comparisons.iter();
        assert_eq!(rows[0].0, vec!["alice", "importance", "a", "b"]);
        assert_eq!(rows[0].1.value, 2.0);
    }

    #[test]
    fn test_missing_column() {
        let dir = input_dir(&[(USERS_FILE, "username,trust\nalice,1\n")]);
        let err = InputDir::new(dir.path()).load_users().unwrap_err();
        assert!(matches!(
            err,
            StoreError::MissingColumn { ref column, .. } if column == "is_pretrusted"
        ));
    }

    #[test]
    fn test_missing_required_file() {
        let dir = input_dir(&[(USERS_FILE, USERS)]);
        let err = InputDir::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, StoreError::MissingFile(_)));
    }

    #[test]
    fn test_invalid_values_name_the_line() {
        let dir = input_dir(&[
            (USERS_FILE, USERS),
            (
                COMPARISONS_FILE,
                "username,criterion,left_name,right_name,value,max\nalice,importance,a,b,-3,10\nalice,importance,a,c,12,10\n",
            ),
        ]);
        match InputDir::new(dir.path()).load_comparisons().unwrap_err() {
            StoreError::InvalidValue { file, line, .. } => {
                assert_eq!(file, COMPARISONS_FILE);
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_trust_outside_unit_interval_is_rejected() {
        for (row, line) in [("alice,1000,true", 2), ("bob,-3,false", 2), ("carol,inf,false", 2)] {
            let content = format!("username,trust,is_pretrusted\n{}\n", row);
            let dir = input_dir(&[(USERS_FILE, content.as_str())]);
            match InputDir::new(dir.path()).load_users().unwrap_err() {
                StoreError::InvalidValue { file, line: at, message } => {
                    assert_eq!(file, USERS_FILE);
                    assert_eq!(at, line);
                    assert!(message.contains("trust"), "{}", message);
                }
                other => panic!("unexpected error: {}", other),
            }
        }

        let dir = input_dir(&[(USERS_FILE, "username,trust,is_pretrusted\nalice,0,true\nbob,1,false\ncarol,nan,false\n")]);
        let users = InputDir::new(dir.path()).load_users().unwrap();
        assert_eq!(users.trust("bob"), 1.0);
        assert_eq!(users.trust("carol"), 0.0);
    }

    #[test]
    fn test_self_comparison_is_rejected() {
        let dir = input_dir(&[(
            COMPARISONS_FILE,
            "username,criterion,left_name,right_name,value,max\nalice,importance,a,a,0,10\n",
        )]);
        let err = InputDir::new(dir.path()).load_comparisons().unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_duplicate_comparison_last_wins() {
        let dir = input_dir(&[(
            COMPARISONS_FILE,
            "username,criterion,left_name,right_name,value,max\n\
             alice,importance,a,b,-3,10\n\
             alice,importance,b,a,-5,10\n",
        )]);
        let comparisons = InputDir::new(dir.path()).load_comparisons().unwrap();
        assert_eq!(comparisons.len(), 1);
        let rows = comparisons.iter();
        assert_eq!(rows[0].0, vec!["alice", "importance", "a", "b"]);
        assert_eq!(rows[0].1.value, 5.0);
    }

    #[test]
    fn test_made_public_file_makes_absent_pairs_private() {
        let dir = input_dir(&[(MADE_PUBLIC_FILE, "username,entity_name,public\nalice,a,1\nalice,b,false\n")]);
        let made_public = InputDir::new(dir.path()).load_made_public().unwrap();
        assert!(made_public.is_public("alice", "a"));
        assert!(!made_public.is_public("alice", "b"));
        assert!(!made_public.is_public("alice", "c"));
    }

    #[test]
    fn test_optional_files_are_carried() {
        let dir = input_dir(&[
            (USERS_FILE, USERS),
            (
                COMPARISONS_FILE,
                "username,criterion,left_name,right_name,value,max\nalice,importance,a,b,-3,10\n",
            ),
            (ENTITIES_FILE, "entity_name\nz\n"),
            (VOUCHES_FILE, "by,to,kind,weight,priority\nalice,bob,personhood,1,0\n"),
            (
                ASSESSMENTS_FILE,
                "username,criterion,entity_name,value,min,max\nalice,importance,z,7,0,10\n",
            ),
        ]);
        let state = InputDir::new(dir.path()).load().unwrap();
        assert!(state.entities.contains("z"));
        assert_eq!(state.entities.len(), 3);
        assert_eq!(state.vouches[0].to, "bob");
        assert_eq!(state.assessments.get(&["alice", "importance", "z"]).unwrap().value, 7.0);
    }
}
