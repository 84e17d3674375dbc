use crate::variables::{quoted_variable_column, UsedVariable, UsedVariables};
use sparql_rel_mapping::{quote_identifier, ResourceClass};

/// Resolves variable references while an expression is rendered.
///
/// Rendering the same expression under different accessors yields the
/// correct per-context SQL: plain column names inside a wrapping `SELECT`,
/// alias-qualified and null-merged references inside a join condition.
pub trait VariableAccessor {
    /// The state of the named variable, or `None` when it is not in scope.
    fn variable(&self, name: &str) -> Option<UsedVariable>;

    /// The SQL expression reading one part of one class of the variable.
    fn column_ref(&self, name: &str, class: &ResourceClass, part: usize) -> String;
}

/// Accessor over a single scope; references render as plain column names.
pub struct SimpleVariableAccessor<'a> {
    variables: &'a UsedVariables,
}

impl<'a> SimpleVariableAccessor<'a> {
    pub fn new(variables: &'a UsedVariables) -> Self {
        Self { variables }
    }
}

impl VariableAccessor for SimpleVariableAccessor<'_> {
    fn variable(&self, name: &str) -> Option<UsedVariable> {
        self.variables.get(name).cloned()
    }

    fn column_ref(&self, name: &str, class: &ResourceClass, part: usize) -> String {
        quoted_variable_column(name, class, part)
    }
}

/// Accessor over both sides of a left join, used for optional filters that
/// may reference outer as well as not-yet-guaranteed inner variables.
pub struct LeftJoinVariableAccessor<'a> {
    left: &'a UsedVariables,
    right: &'a UsedVariables,
    left_alias: &'a str,
    right_alias: &'a str,
}

impl<'a> LeftJoinVariableAccessor<'a> {
    pub fn new(
        left: &'a UsedVariables,
        right: &'a UsedVariables,
        left_alias: &'a str,
        right_alias: &'a str,
    ) -> Self {
        Self {
            left,
            right,
            left_alias,
            right_alias,
        }
    }

    fn side_ref(&self, alias: &str, name: &str, class: &ResourceClass, part: usize) -> String {
        format!(
            "{}.{}",
            quote_identifier(alias),
            quoted_variable_column(name, class, part)
        )
    }
}

impl VariableAccessor for LeftJoinVariableAccessor<'_> {
    fn variable(&self, name: &str) -> Option<UsedVariable> {
        match (self.left.get(name), self.right.get(name)) {
            (Some(left), Some(right)) => {
                let mut merged = left.clone();
                for class in right.classes() {
                    merged.add_class(class.clone());
                }
                Some(merged)
            }
            (Some(left), None) => Some(left.clone()),
            (None, Some(right)) => Some(right.clone()),
            (None, None) => None,
        }
    }

    fn column_ref(&self, name: &str, class: &ResourceClass, part: usize) -> String {
        let on_left = self
            .left
            .get(name)
            .is_some_and(|v| v.classes().contains(class));
        let on_right = self
            .right
            .get(name)
            .is_some_and(|v| v.classes().contains(class));

        match (on_left, on_right) {
            (true, true) => format!(
                "COALESCE({}, {})",
                self.side_ref(self.left_alias, name, class, part),
                self.side_ref(self.right_alias, name, class, part)
            ),
            (true, false) => self.side_ref(self.left_alias, name, class, part),
            (false, _) => self.side_ref(self.right_alias, name, class, part),
        }
    }
}
