use sparql_rel_mapping::{quote_identifier, ResourceClass};

/// The physical column name carrying one part of one class of a variable.
///
/// `!` cannot appear in parsed variable names, so generated names never
/// collide with each other or with user-visible identifiers.
pub fn variable_column(name: &str, class: &ResourceClass, part: usize) -> String {
    format!("{name}!{}!{part}", class.name())
}

/// The quoted form of [`variable_column`].
pub fn quoted_variable_column(name: &str, class: &ResourceClass, part: usize) -> String {
    quote_identifier(&variable_column(name, class, part))
}

/// A query variable's state at one point of the compiled algebra.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedVariable {
    name: String,
    /// The resource classes the variable may hold here. Never empty.
    classes: Vec<ResourceClass>,
    can_be_null: bool,
}

impl UsedVariable {
    pub fn new(name: impl Into<String>, class: ResourceClass, can_be_null: bool) -> Self {
        Self {
            name: name.into(),
            classes: vec![class],
            can_be_null,
        }
    }

    pub fn with_classes(
        name: impl Into<String>,
        classes: Vec<ResourceClass>,
        can_be_null: bool,
    ) -> Self {
        debug_assert!(!classes.is_empty());
        Self {
            name: name.into(),
            classes,
            can_be_null,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn classes(&self) -> &[ResourceClass] {
        &self.classes
    }

    pub fn can_be_null(&self) -> bool {
        self.can_be_null
    }

    pub fn set_nullable(&mut self, can_be_null: bool) {
        self.can_be_null = can_be_null;
    }

    /// The only class the variable can hold, when statically unambiguous.
    pub fn single_class(&self) -> Option<&ResourceClass> {
        match self.classes.as_slice() {
            [class] => Some(class),
            _ => None,
        }
    }

    pub fn add_class(&mut self, class: ResourceClass) {
        if !self.classes.contains(&class) {
            self.classes.push(class);
        }
    }

    /// Classes present in both variables, in this variable's order.
    pub fn shared_classes(&self, other: &UsedVariable) -> Vec<ResourceClass> {
        self.classes
            .iter()
            .filter(|c| other.classes.contains(c))
            .cloned()
            .collect()
    }

    /// All physical column names of this variable, classes in order, parts
    /// in order within each class.
    pub fn column_names(&self) -> Vec<String> {
        self.classes
            .iter()
            .flat_map(|class| {
                (0..class.part_count()).map(move |part| variable_column(&self.name, class, part))
            })
            .collect()
    }
}

/// The ordered, name-keyed variable scope of one algebra node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedVariables {
    variables: Vec<UsedVariable>,
}

impl UsedVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub const fn empty() -> Self {
        Self {
            variables: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&UsedVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut UsedVariable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Adds or replaces the entry of the same name.
    pub fn insert(&mut self, variable: UsedVariable) {
        match self.get_mut(&variable.name) {
            Some(existing) => *existing = variable,
            None => self.variables.push(variable),
        }
    }

    /// Adds the variable, merging classes (union) and nullability (OR) with
    /// an existing entry of the same name.
    pub fn merge(&mut self, variable: UsedVariable) {
        match self.get_mut(&variable.name) {
            Some(existing) => {
                for class in variable.classes {
                    existing.add_class(class);
                }
                existing.can_be_null |= variable.can_be_null;
            }
            None => self.variables.push(variable),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &UsedVariable> {
        self.variables.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(|v| v.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl FromIterator<UsedVariable> for UsedVariables {
    fn from_iter<T: IntoIterator<Item = UsedVariable>>(iter: T) -> Self {
        let mut variables = UsedVariables::new();
        for variable in iter {
            variables.merge(variable);
        }
        variables
    }
}

/// Generator of synthetic variable names.
///
/// `@` is invalid in parsed variable names, so synthetic names never collide
/// with query variables.
#[derive(Debug, Default)]
pub struct SyntheticVariables {
    next: usize,
}

impl SyntheticVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("@v{}", self.next);
        self.next += 1;
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sparql_rel_mapping::LiteralClass;

    #[test]
    fn column_names_cover_all_parts() {
        let mut variable = UsedVariable::new("x", ResourceClass::Iri, false);
        variable.add_class(ResourceClass::UnsupportedLiteral);

        assert_eq!(
            variable.column_names(),
            vec![
                "x!iri!0".to_owned(),
                "x!unsupported-literal!0".to_owned(),
                "x!unsupported-literal!1".to_owned(),
            ]
        );
    }

    #[test]
    fn merge_unions_classes_and_ors_nullability() {
        let mut scope = UsedVariables::new();
        scope.merge(UsedVariable::new(
            "x",
            ResourceClass::Literal(LiteralClass::Integer),
            false,
        ));
        scope.merge(UsedVariable::new("x", ResourceClass::Iri, true));

        let variable = scope.get("x").unwrap();
        assert_eq!(variable.classes().len(), 2);
        assert!(variable.can_be_null());
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn synthetic_names_are_never_valid_query_variables() {
        let mut synthetic = SyntheticVariables::new();
        assert_eq!(synthetic.fresh(), "@v0");
        assert_eq!(synthetic.fresh(), "@v1");
    }
}
