use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Opaque host value carried by variables, execution attributes and
/// expression objects.
pub type Value = serde_json::Value;

const LEVEL_UNSET: usize = usize::MAX;
const LEVEL_GROWTH: usize = 3;

/// A binding slot inside one scope level. `Removed` shadows ancestor
/// bindings without touching them, so deletion is local to the level that
/// performed it.
#[derive(Debug, Clone, PartialEq)]
enum Binding {
    Set(Value),
    Removed,
}

/// Wrapper distinguishing "no selection target set at this level" from
/// "selection target set to null".
#[derive(Debug, Clone, PartialEq)]
struct SelectionTarget(Option<Value>);

/// A level-indexed stack of sparse variable maps.
///
/// Level 0 always exists; deeper levels materialize lazily on the first
/// write at that nesting depth, so entering a body that declares nothing
/// costs nothing. Reads scan initialized slots from the deepest one at or
/// below the current level back to 0 and stop at the first hit, which
/// realizes dynamic shadowing without copying parent bindings.
pub struct VariableScopes {
    level: usize,
    index: usize,
    levels: Vec<usize>,
    maps: Vec<Option<HashMap<String, Binding>>>,
    selection_targets: Vec<Option<SelectionTarget>>,
    inlining: Vec<Option<bool>>,
}

impl VariableScopes {
    pub fn new() -> Self {
        let mut scopes = VariableScopes {
            level: 0,
            index: 0,
            levels: vec![LEVEL_UNSET; LEVEL_GROWTH],
            maps: vec![None; LEVEL_GROWTH],
            selection_targets: vec![None; LEVEL_GROWTH],
            inlining: vec![None; LEVEL_GROWTH],
        };
        scopes.levels[0] = 0;
        // Text inlining is active unless a processor switches it off.
        scopes.inlining[0] = Some(true);
        scopes
    }

    /// Creates a stack whose root level is pre-populated with the given
    /// variables (the per-document initial context).
    pub fn with_variables(variables: HashMap<String, Value>) -> Self {
        let mut scopes = VariableScopes::new();
        scopes.put_all(variables);
        scopes
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn contains(&self, name: &str) -> bool {
        let mut n = self.index + 1;
        while n != 0 {
            n -= 1;
            if let Some(map) = &self.maps[n] {
                if let Some(binding) = map.get(name) {
                    // The most recent entry for this name may be a removal.
                    return !matches!(binding, Binding::Removed);
                }
            }
        }
        false
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let mut n = self.index + 1;
        while n != 0 {
            n -= 1;
            if let Some(map) = &self.maps[n] {
                match map.get(name) {
                    Some(Binding::Set(value)) => return Some(value),
                    Some(Binding::Removed) => return None,
                    None => {}
                }
            }
        }
        None
    }

    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        self.ensure_level_initialized();
        self.current_map().insert(name.into(), Binding::Set(value));
    }

    pub fn put_all(&mut self, variables: HashMap<String, Value>) {
        if variables.is_empty() {
            return;
        }
        self.ensure_level_initialized();
        let map = self.current_map();
        for (name, value) in variables {
            map.insert(name, Binding::Set(value));
        }
    }

    /// Removes a variable as seen from the current level. At level 0 the
    /// entry is dropped outright; at deeper levels a `Removed` marker is
    /// recorded so the ancestor binding reappears when the level is popped.
    pub fn remove(&mut self, name: &str) {
        if !self.contains(name) {
            return;
        }
        self.ensure_level_initialized();
        if self.level == 0 {
            self.current_map().remove(name);
        } else {
            self.current_map()
                .insert(name.to_string(), Binding::Removed);
        }
    }

    /// All variable names visible from the current level, with shadowing
    /// and removals applied. Sorted for determinism.
    pub fn variable_names(&self) -> Vec<String> {
        let mut names = BTreeSet::new();
        for n in 0..=self.index {
            if let Some(map) = &self.maps[n] {
                for (name, binding) in map {
                    match binding {
                        Binding::Set(_) => {
                            names.insert(name.clone());
                        }
                        Binding::Removed => {
                            names.remove(name);
                        }
                    }
                }
            }
        }
        names.into_iter().collect()
    }

    pub fn has_selection_target(&self) -> bool {
        let mut n = self.index + 1;
        while n != 0 {
            n -= 1;
            if self.selection_targets[n].is_some() {
                return true;
            }
        }
        false
    }

    pub fn selection_target(&self) -> Option<&Value> {
        let mut n = self.index + 1;
        while n != 0 {
            n -= 1;
            if let Some(target) = &self.selection_targets[n] {
                return target.0.as_ref();
            }
        }
        None
    }

    pub fn set_selection_target(&mut self, target: Option<Value>) {
        self.ensure_level_initialized();
        self.selection_targets[self.index] = Some(SelectionTarget(target));
    }

    pub fn is_text_inlining_active(&self) -> bool {
        let mut n = self.index + 1;
        while n != 0 {
            n -= 1;
            if let Some(active) = self.inlining[n] {
                return active;
            }
        }
        false
    }

    pub fn set_text_inlining_active(&mut self, active: bool) {
        self.ensure_level_initialized();
        self.inlining[self.index] = Some(active);
    }

    pub fn increase_level(&mut self) {
        self.level += 1;
    }

    pub fn decrease_level(&mut self) {
        assert!(
            self.level > 0,
            "cannot decrease variable scope level below 0"
        );
        if self.levels[self.index] == self.level {
            // The departing level owned a slot: clear it for reuse.
            self.levels[self.index] = LEVEL_UNSET;
            if let Some(map) = &mut self.maps[self.index] {
                map.clear();
            }
            self.selection_targets[self.index] = None;
            self.inlining[self.index] = None;
            self.index -= 1;
        }
        self.level -= 1;
    }

    fn current_map(&mut self) -> &mut HashMap<String, Binding> {
        self.maps[self.index].get_or_insert_with(HashMap::new)
    }

    fn ensure_level_initialized(&mut self) {
        if self.levels[self.index] != self.level {
            // The current level has no slot yet: claim the next one, growing
            // the parallel arrays if exhausted.
            self.index += 1;
            if self.index == self.levels.len() {
                let new_len = self.levels.len() + LEVEL_GROWTH;
                self.levels.resize(new_len, LEVEL_UNSET);
                self.maps.resize(new_len, None);
                self.selection_targets.resize(new_len, None);
                self.inlining.resize(new_len, None);
            }
            self.levels[self.index] = self.level;
        }
        if self.maps[self.index].is_none() {
            self.maps[self.index] = Some(HashMap::new());
        }
    }
}

impl Default for VariableScopes {
    fn default() -> Self {
        VariableScopes::new()
    }
}

impl fmt::Display for VariableScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut merged: HashMap<&str, &Value> = HashMap::new();
        for n in 0..=self.index {
            if let Some(map) = &self.maps[n] {
                for (name, binding) in map {
                    match binding {
                        Binding::Set(value) => {
                            merged.insert(name, value);
                        }
                        Binding::Removed => {
                            merged.remove(name.as_str());
                        }
                    }
                }
            }
        }
        let mut names: Vec<&&str> = merged.keys().collect();
        names.sort();
        write!(f, "{{")?;
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", name, merged[**name])?;
        }
        write!(f, "}}")?;
        if self.has_selection_target() {
            match self.selection_target() {
                Some(target) => write!(f, "<{target}>")?,
                None => write!(f, "<null>")?,
            }
        }
        write!(f, "[{}]", self.is_text_inlining_active())
    }
}

impl fmt::Debug for VariableScopes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableScopes")
            .field("level", &self.level)
            .field("index", &self.index)
            .field("view", &self.to_string())
            .finish()
    }
}
