//! In-memory analysis database.

use crate::analysis::snapshot::{CommentEntry, FunctionEntry, GlobalEntry, Snapshot, VariableEntry};
use crate::analysis::types::*;
use crate::analysis::{AnalysisSource, SourceError};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Analysis database held in memory, typically loaded from a [`Snapshot`].
///
/// Enforces the engine-side naming rules: symbol names may not contain
/// whitespace, function names are unique, and variable names are unique
/// within their function.
#[derive(Debug)]
pub struct InMemorySource {
    db: RwLock<Database>,
}

#[derive(Debug, Default)]
struct Database {
    binary: BinaryInfo,
    functions: BTreeMap<u64, StoredFunction>,
    globals: Vec<GlobalEntry>,
    comments: BTreeMap<u64, String>,
    cursor: Option<u64>,
}

#[derive(Debug)]
struct StoredFunction {
    name: String,
    start: u64,
    ranges: Vec<AddressRange>,
    instructions: Vec<InstructionLine>,
    decompiled: Option<String>,
    variables: Vec<VariableEntry>,
}

impl StoredFunction {
    fn record(&self, id: u64) -> FunctionRecord {
        FunctionRecord {
            handle: FunctionHandle(id),
            name: self.name.clone(),
            start: self.start,
            ranges: self.ranges.clone(),
        }
    }
}

fn variable_record(function: FunctionHandle, index: usize, var: &VariableEntry) -> VariableRecord {
    VariableRecord {
        handle: VariableHandle {
            function,
            index: index as u32,
        },
        name: var.name.clone(),
        type_name: var.type_name.clone(),
    }
}

fn global_record(index: usize, global: &GlobalEntry) -> GlobalRecord {
    GlobalRecord {
        handle: GlobalHandle(index as u64),
        name: global.name.clone(),
        address: global.address,
        type_name: global.type_name.clone(),
        value: global.value.clone(),
    }
}

fn check_symbol_name(name: &str) -> Result<(), SourceError> {
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return Err(SourceError::Rejected(format!(
            "'{name}' is not a valid symbol name"
        )));
    }
    Ok(())
}

impl InMemorySource {
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let functions = snapshot
            .functions
            .into_iter()
            .enumerate()
            .map(|(id, entry)| {
                let ranges = entry.effective_ranges();
                let FunctionEntry {
                    name,
                    start,
                    instructions,
                    decompiled,
                    variables,
                    ..
                } = entry;
                (
                    id as u64,
                    StoredFunction {
                        name,
                        start,
                        ranges,
                        instructions,
                        decompiled,
                        variables,
                    },
                )
            })
            .collect();

        let comments = snapshot
            .comments
            .into_iter()
            .map(|c| (c.address, c.comment))
            .collect();

        Self {
            db: RwLock::new(Database {
                binary: snapshot.binary,
                functions,
                globals: snapshot.globals,
                comments,
                cursor: snapshot.cursor,
            }),
        }
    }

    /// Export the current state, including any mutations applied since load.
    pub fn snapshot(&self) -> Snapshot {
        let db = self.read();
        let mut functions: Vec<&StoredFunction> = db.functions.values().collect();
        functions.sort_by_key(|f| f.start);
        Snapshot {
            binary: db.binary.clone(),
            functions: functions
                .into_iter()
                .map(|f| FunctionEntry {
                    name: f.name.clone(),
                    start: f.start,
                    ranges: f.ranges.clone(),
                    instructions: f.instructions.clone(),
                    decompiled: f.decompiled.clone(),
                    variables: f.variables.clone(),
                })
                .collect(),
            globals: db.globals.clone(),
            comments: db
                .comments
                .iter()
                .map(|(address, comment)| CommentEntry {
                    address: *address,
                    comment: comment.clone(),
                })
                .collect(),
            cursor: db.cursor,
        }
    }

    /// Cursor address recorded in the snapshot, if any.
    pub fn recorded_cursor(&self) -> Option<u64> {
        self.read().cursor
    }

    /// Drop a function from the database, as re-analysis would.
    /// Outstanding handles to it stop resolving.
    pub fn remove_function(&self, handle: FunctionHandle) -> bool {
        self.write().functions.remove(&handle.0).is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Database> {
        match self.db.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Database> {
        match self.db.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl AnalysisSource for InMemorySource {
    fn functions_named(&self, name: &str) -> Vec<FunctionRecord> {
        let db = self.read();
        let mut found: Vec<FunctionRecord> = db
            .functions
            .iter()
            .filter(|(_, f)| f.name == name)
            .map(|(id, f)| f.record(*id))
            .collect();
        found.sort_by_key(|f| f.start);
        found
    }

    fn function(&self, handle: FunctionHandle) -> Option<FunctionRecord> {
        self.read()
            .functions
            .get(&handle.0)
            .map(|f| f.record(handle.0))
    }

    fn function_containing(&self, address: u64) -> Option<FunctionRecord> {
        let db = self.read();
        db.functions
            .iter()
            .filter(|(_, f)| f.ranges.iter().any(|r| r.contains(address)))
            .min_by_key(|(_, f)| f.start)
            .map(|(id, f)| f.record(*id))
    }

    fn functions(&self) -> Vec<FunctionRecord> {
        let db = self.read();
        let mut all: Vec<FunctionRecord> =
            db.functions.iter().map(|(id, f)| f.record(*id)).collect();
        all.sort_by_key(|f| f.start);
        all
    }

    fn variables_named(&self, function: FunctionHandle, name: &str) -> Vec<VariableRecord> {
        let db = self.read();
        let Some(func) = db.functions.get(&function.0) else {
            return Vec::new();
        };
        func.variables
            .iter()
            .enumerate()
            .filter(|(_, v)| v.name == name)
            .map(|(i, v)| variable_record(function, i, v))
            .collect()
    }

    fn variable(&self, handle: VariableHandle) -> Option<VariableRecord> {
        let db = self.read();
        let func = db.functions.get(&handle.function.0)?;
        let index = handle.index as usize;
        func.variables
            .get(index)
            .map(|v| variable_record(handle.function, index, v))
    }

    fn globals_named(&self, name: &str) -> Vec<GlobalRecord> {
        self.read()
            .globals
            .iter()
            .enumerate()
            .filter(|(_, g)| g.name == name)
            .map(|(i, g)| global_record(i, g))
            .collect()
    }

    fn instructions(&self, function: FunctionHandle) -> Result<Vec<InstructionLine>, SourceError> {
        let db = self.read();
        let func = db
            .functions
            .get(&function.0)
            .ok_or_else(|| SourceError::Stale(format!("function #{}", function.0)))?;
        Ok(func.instructions.clone())
    }

    fn decompiled(&self, function: FunctionHandle) -> Result<String, SourceError> {
        let db = self.read();
        let func = db
            .functions
            .get(&function.0)
            .ok_or_else(|| SourceError::Stale(format!("function #{}", function.0)))?;
        func.decompiled.clone().ok_or_else(|| {
            SourceError::Unavailable(format!(
                "No decompiled representation available for '{}'",
                func.name
            ))
        })
    }

    fn binary_info(&self) -> BinaryInfo {
        self.read().binary.clone()
    }

    fn comment_at(&self, address: u64) -> Option<String> {
        self.read().comments.get(&address).cloned()
    }

    fn rename_function(
        &self,
        function: FunctionHandle,
        new_name: &str,
    ) -> Result<(), SourceError> {
        check_symbol_name(new_name)?;
        let mut db = self.write();
        if db
            .functions
            .iter()
            .any(|(id, f)| *id != function.0 && f.name == new_name)
        {
            return Err(SourceError::Rejected(format!(
                "A function named '{new_name}' already exists"
            )));
        }
        let func = db
            .functions
            .get_mut(&function.0)
            .ok_or_else(|| SourceError::Stale(format!("function #{}", function.0)))?;
        func.name = new_name.to_string();
        Ok(())
    }

    fn rename_variable(
        &self,
        variable: VariableHandle,
        new_name: &str,
    ) -> Result<(), SourceError> {
        check_symbol_name(new_name)?;
        let mut db = self.write();
        let func = db
            .functions
            .get_mut(&variable.function.0)
            .ok_or_else(|| SourceError::Stale(format!("function #{}", variable.function.0)))?;
        let index = variable.index as usize;
        if func
            .variables
            .iter()
            .enumerate()
            .any(|(i, v)| i != index && v.name == new_name)
        {
            return Err(SourceError::Rejected(format!(
                "Function '{}' already has a variable named '{new_name}'",
                func.name
            )));
        }
        let var = func
            .variables
            .get_mut(index)
            .ok_or_else(|| SourceError::Stale(format!("variable #{index}")))?;
        var.name = new_name.to_string();
        Ok(())
    }

    fn set_variable_type(
        &self,
        variable: VariableHandle,
        new_type: &str,
    ) -> Result<(), SourceError> {
        if new_type.trim().is_empty() {
            return Err(SourceError::Rejected("Type must not be empty".to_string()));
        }
        let mut db = self.write();
        let var = db
            .functions
            .get_mut(&variable.function.0)
            .and_then(|f| f.variables.get_mut(variable.index as usize))
            .ok_or_else(|| SourceError::Stale(format!("variable #{}", variable.index)))?;
        var.type_name = new_type.trim().to_string();
        Ok(())
    }

    fn set_comment(&self, address: u64, comment: &str) -> Result<(), SourceError> {
        let mut db = self.write();
        if comment.is_empty() {
            db.comments.remove(&address);
        } else {
            db.comments.insert(address, comment.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> InMemorySource {
        Snapshot::from_json(
            r#"{
                "functions": [
                    {"name": "helper", "start": 8192, "ranges": [{"start": 8192, "end": 8208}],
                     "variables": [{"name": "var_8", "type": "int32_t"}, {"name": "arg1", "type": "char*"}]},
                    {"name": "main", "start": 4096, "ranges": [{"start": 4096, "end": 4160}],
                     "decompiled": "int main() { return 0; }"},
                    {"name": "helper", "start": 12288}
                ],
                "globals": [{"name": "g_flag", "address": 16384, "value": "1"}]
            }"#,
        )
        .expect("valid snapshot")
        .into_source()
    }

    #[test]
    fn exact_name_lookup_returns_every_match() {
        let src = source();
        assert_eq!(src.functions_named("helper").len(), 2);
        assert_eq!(src.functions_named("help").len(), 0);
        assert_eq!(src.functions_named("main")[0].start, 0x1000);
    }

    #[test]
    fn functions_are_ordered_by_start() {
        let starts: Vec<u64> = source().functions().iter().map(|f| f.start).collect();
        assert_eq!(starts, vec![0x1000, 0x2000, 0x3000]);
    }

    #[test]
    fn rename_rejects_duplicates_and_whitespace() {
        let src = source();
        let main = src.functions_named("main")[0].handle;
        assert!(matches!(
            src.rename_function(main, "helper"),
            Err(SourceError::Rejected(_))
        ));
        assert!(matches!(
            src.rename_function(main, "my main"),
            Err(SourceError::Rejected(_))
        ));
        src.rename_function(main, "entry").expect("rename");
        assert_eq!(src.function(main).map(|f| f.name), Some("entry".to_string()));
    }

    #[test]
    fn variable_rename_is_scoped_to_function() {
        let src = source();
        let helper = src.functions_named("helper")[0].handle;
        let var = src.variables_named(helper, "var_8")[0].handle;
        assert!(matches!(
            src.rename_variable(var, "arg1"),
            Err(SourceError::Rejected(_))
        ));
        src.rename_variable(var, "counter").expect("rename");
        assert_eq!(src.variable(var).map(|v| v.name), Some("counter".to_string()));
    }

    #[test]
    fn comments_overwrite_and_clear() {
        let src = source();
        src.set_comment(0x1004, "first").expect("set");
        src.set_comment(0x1004, "second").expect("set");
        assert_eq!(src.comment_at(0x1004).as_deref(), Some("second"));
        src.set_comment(0x1004, "").expect("clear");
        assert_eq!(src.comment_at(0x1004), None);
    }

    #[test]
    fn removed_function_handle_goes_stale() {
        let src = source();
        let main = src.functions_named("main")[0].handle;
        assert!(src.remove_function(main));
        assert!(src.function(main).is_none());
        assert!(matches!(src.decompiled(main), Err(SourceError::Stale(_))));
    }

    #[test]
    fn missing_decompilation_is_unavailable() {
        let src = source();
        let helper = src.functions_named("helper")[0].handle;
        assert!(matches!(
            src.decompiled(helper),
            Err(SourceError::Unavailable(_))
        ));
    }

    #[test]
    fn snapshot_reflects_mutations() {
        let src = source();
        let main = src.functions_named("main")[0].handle;
        src.rename_function(main, "start").expect("rename");
        src.set_comment(0x1000, "entry point").expect("comment");
        let snap = src.snapshot();
        assert_eq!(snap.functions[0].name, "start");
        assert_eq!(snap.comments[0].comment, "entry point");
    }
}
