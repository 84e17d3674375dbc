use crate::context::TranslationContext;
use crate::database::{quote_identifier, quote_string_literal, Column, Table};
use crate::error::FatalError;
use regex::Regex;
use sparql_rel_model::Node;
use std::fmt;
use std::sync::Arc;

/// A built-in literal datatype with a single-column SQL encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralClass {
    Boolean,
    Integer,
    Decimal,
    Double,
    String,
    Date,
    DateTime,
}

impl LiteralClass {
    pub const ALL: [LiteralClass; 7] = [
        LiteralClass::Boolean,
        LiteralClass::Integer,
        LiteralClass::Decimal,
        LiteralClass::Double,
        LiteralClass::String,
        LiteralClass::Date,
        LiteralClass::DateTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            LiteralClass::Boolean => "boolean",
            LiteralClass::Integer => "integer",
            LiteralClass::Decimal => "decimal",
            LiteralClass::Double => "double",
            LiteralClass::String => "string",
            LiteralClass::Date => "date",
            LiteralClass::DateTime => "datetime",
        }
    }

    pub fn sql_type(self) -> &'static str {
        match self {
            LiteralClass::Boolean => "boolean",
            LiteralClass::Integer => "bigint",
            LiteralClass::Decimal => "numeric",
            LiteralClass::Double => "double precision",
            LiteralClass::String => "varchar",
            LiteralClass::Date => "date",
            LiteralClass::DateTime => "timestamptz",
        }
    }

    pub fn datatype_iri(self) -> &'static str {
        match self {
            LiteralClass::Boolean => "http://www.w3.org/2001/XMLSchema#boolean",
            LiteralClass::Integer => "http://www.w3.org/2001/XMLSchema#integer",
            LiteralClass::Decimal => "http://www.w3.org/2001/XMLSchema#decimal",
            LiteralClass::Double => "http://www.w3.org/2001/XMLSchema#double",
            LiteralClass::String => "http://www.w3.org/2001/XMLSchema#string",
            LiteralClass::Date => "http://www.w3.org/2001/XMLSchema#date",
            LiteralClass::DateTime => "http://www.w3.org/2001/XMLSchema#dateTime",
        }
    }

    pub fn from_datatype(datatype: &str) -> Option<LiteralClass> {
        LiteralClass::ALL
            .into_iter()
            .find(|c| c.datatype_iri() == datatype)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            LiteralClass::Integer | LiteralClass::Decimal | LiteralClass::Double
        )
    }
}

/// A map-backed user IRI class.
///
/// Membership is defined by a relational lookup table translating an external
/// identifier (embedded in the IRI between an optional prefix and suffix) to
/// an internal one. The structural pattern is derived at construction time
/// and pre-filters candidates before any backend round trip.
#[derive(Debug)]
pub struct MapUserIriClass {
    name: String,
    sql_type: String,
    table: Table,
    from: String,
    to: String,
    prefix: Option<String>,
    suffix: Option<String>,
    length: usize,
    pattern: Regex,
    pattern_text: String,
    lookup_sql: String,
}

impl MapUserIriClass {
    /// Builds a new class. `length` of zero means the embedded identifier is
    /// unbounded; `inner_pattern` further restricts it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        sql_type: impl Into<String>,
        table: Table,
        from: impl Into<String>,
        to: impl Into<String>,
        prefix: Option<String>,
        length: usize,
        inner_pattern: Option<&str>,
        suffix: Option<String>,
    ) -> Result<Self, regex::Error> {
        let mut pattern_text = String::new();

        if let Some(prefix) = &prefix {
            pattern_text.push_str(&regex::escape(prefix));
        }

        if let Some(inner) = inner_pattern {
            pattern_text.push('(');
            pattern_text.push_str(inner);
            pattern_text.push(')');
        } else if length > 0 {
            pattern_text.push_str(&format!(".{{{length}}}"));
        } else {
            pattern_text.push_str(".*");
        }

        if let Some(suffix) = &suffix {
            pattern_text.push_str(&regex::escape(suffix));
        }

        let pattern = Regex::new(&format!("^(?s:{pattern_text})$"))?;

        let mut class = Self {
            name: name.into(),
            sql_type: sql_type.into(),
            table,
            from: from.into(),
            to: to.into(),
            prefix,
            suffix,
            length,
            pattern,
            pattern_text,
            lookup_sql: String::new(),
        };

        class.lookup_sql = format!(
            "SELECT {}::varchar FROM {} WHERE {} = {}",
            quote_identifier(&class.from),
            class.table,
            quote_identifier(&class.to),
            class.extraction_code("$1")
        );

        Ok(class)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sql_type(&self) -> &str {
        &self.sql_type
    }

    /// The parameterised lookup statement executed on a cache miss.
    pub fn lookup_sql(&self) -> &str {
        &self.lookup_sql
    }

    /// Structural pre-filter: whether the IRI text can belong to this class
    /// at all. A positive answer still requires a relational lookup.
    pub fn matches_text(&self, iri: &str) -> bool {
        self.pattern.is_match(iri)
    }

    pub(crate) fn columns_for_internal_id(&self, value: &str) -> Vec<Column> {
        vec![Column::Constant(format!(
            "{}::{}",
            quote_string_literal(value),
            self.sql_type
        ))]
    }

    /// SQL extracting the external identifier out of an IRI-valued parameter.
    fn extraction_code(&self, parameter: &str) -> String {
        match (&self.prefix, &self.suffix) {
            (None, None) => format!("{parameter}::varchar"),
            _ if self.length > 0 => {
                let start = self.prefix.as_ref().map_or(0, |p| p.len()) + 1;
                format!("substring({parameter}, {start}, {})::varchar", self.length)
            }
            (None, Some(suffix)) => format!("left({parameter}, -{})::varchar", suffix.len()),
            (Some(prefix), None) => format!("right({parameter}, -{})::varchar", prefix.len()),
            (Some(prefix), Some(suffix)) => format!(
                "left(right({parameter}, -{}), -{})::varchar",
                prefix.len(),
                suffix.len()
            ),
        }
    }

    fn id_table_access(&self) -> String {
        format!(
            "(SELECT {} AS \"@from\", {} AS \"@to\" FROM {}) AS \"@rctab\"",
            quote_identifier(&self.from),
            quote_identifier(&self.to),
            self.table
        )
    }

    /// SQL reconstructing the IRI text from an internal-identifier parameter.
    pub fn generate_function(&self, parameter: &Column) -> Column {
        let mut code = String::from("\"@to\"");

        if let Some(prefix) = &self.prefix {
            code = format!("{} || {}", quote_string_literal(prefix), code);
        }

        if let Some(suffix) = &self.suffix {
            code = format!("{} || {}", code, quote_string_literal(suffix));
        }

        Column::Expression(format!(
            "(SELECT ({})::varchar FROM {} WHERE \"@from\" = {})",
            code,
            self.id_table_access(),
            parameter
        ))
    }

    /// SQL reducing an IRI-valued parameter back to the internal identifier.
    ///
    /// With `check` set, the expression is wrapped in a `CASE` guard that
    /// validates the structural pattern first; callers omit the guard only
    /// when the input is statically known to match.
    pub fn generate_inverse_function(&self, parameter: &Column, check: bool) -> Column {
        if self.prefix.is_none() && self.suffix.is_none() && !check {
            return parameter.clone();
        }

        let mut code = String::new();

        if check {
            code.push_str(&format!(
                "CASE WHEN sparql.regex_string({}, {}, '') THEN ",
                parameter,
                quote_string_literal(&format!("^({})$", self.pattern_text))
            ));
        }

        code.push_str(&format!(
            "(SELECT \"@from\"::{} FROM {} WHERE \"@to\" = {})",
            self.sql_type,
            self.id_table_access(),
            self.extraction_code(&parameter.to_string())
        ));

        if check {
            code.push_str(" END");
        }

        Column::Expression(code)
    }
}

impl PartialEq for MapUserIriClass {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.table == other.table
            && self.from == other.from
            && self.to == other.to
            && self.prefix == other.prefix
            && self.suffix == other.suffix
            && self.length == other.length
            && self.pattern_text == other.pattern_text
    }
}

impl Eq for MapUserIriClass {}

/// A descriptor of one physical relational encoding of a logical value kind.
///
/// Matching is a pure predicate except for [`ResourceClass::User`], which is
/// backed by a relational lookup routed through the classification cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceClass {
    /// A plain IRI stored as its full text.
    Iri,
    /// A blank node label column.
    BlankNode,
    /// A typed literal of a built-in datatype.
    Literal(LiteralClass),
    /// A language-tagged string with a fixed tag.
    LangString(String),
    /// Fallback for IRIs no configured class covers.
    UnsupportedIri,
    /// Fallback for literals of unknown datatype: value plus datatype IRI.
    UnsupportedLiteral,
    /// A map-backed user IRI family.
    User(Arc<MapUserIriClass>),
}

impl ResourceClass {
    pub fn name(&self) -> String {
        match self {
            ResourceClass::Iri => "iri".to_owned(),
            ResourceClass::BlankNode => "blanknode".to_owned(),
            ResourceClass::Literal(l) => l.name().to_owned(),
            ResourceClass::LangString(tag) => format!("lang@{tag}"),
            ResourceClass::UnsupportedIri => "unsupported-iri".to_owned(),
            ResourceClass::UnsupportedLiteral => "unsupported-literal".to_owned(),
            ResourceClass::User(u) => u.name().to_owned(),
        }
    }

    /// The ordered SQL column types one value of this class occupies. The
    /// part count and order are fixed for the lifetime of the class.
    pub fn parts(&self) -> Vec<String> {
        match self {
            ResourceClass::Iri
            | ResourceClass::BlankNode
            | ResourceClass::LangString(_)
            | ResourceClass::UnsupportedIri => vec!["varchar".to_owned()],
            ResourceClass::Literal(l) => vec![l.sql_type().to_owned()],
            ResourceClass::UnsupportedLiteral => vec!["varchar".to_owned(), "varchar".to_owned()],
            ResourceClass::User(u) => vec![u.sql_type().to_owned()],
        }
    }

    pub fn part_count(&self) -> usize {
        match self {
            ResourceClass::UnsupportedLiteral => 2,
            _ => 1,
        }
    }

    pub fn is_iri_kind(&self) -> bool {
        matches!(
            self,
            ResourceClass::Iri | ResourceClass::UnsupportedIri | ResourceClass::User(_)
        )
    }

    pub fn is_literal_kind(&self) -> bool {
        matches!(
            self,
            ResourceClass::Literal(_)
                | ResourceClass::LangString(_)
                | ResourceClass::UnsupportedLiteral
        )
    }

    /// Tests whether a concrete pattern node can be produced by this class.
    ///
    /// Variables and blank nodes match every class. For user classes the
    /// test consults the classification cache and only queries the backend
    /// on a miss.
    pub fn match_node(&self, node: &Node, ctx: &TranslationContext<'_>) -> Result<bool, FatalError> {
        if node.is_variable_or_blank_node() {
            return Ok(true);
        }

        Ok(match self {
            ResourceClass::Iri | ResourceClass::UnsupportedIri => matches!(node, Node::Iri(_)),
            ResourceClass::BlankNode => false,
            ResourceClass::Literal(class) => match node {
                Node::Literal(literal) => {
                    literal.language().is_none()
                        && LiteralClass::from_datatype(literal.datatype().as_str()) == Some(*class)
                }
                _ => false,
            },
            ResourceClass::LangString(tag) => match node {
                Node::Literal(literal) => literal.language() == Some(tag.as_str()),
                _ => false,
            },
            ResourceClass::UnsupportedLiteral => matches!(node, Node::Literal(_)),
            ResourceClass::User(class) => match node {
                Node::Iri(iri) => {
                    class.matches_text(iri.as_str())
                        && ctx.resolve_user_class(class, iri.as_str())?.is_some()
                }
                _ => false,
            },
        })
    }

    /// Converts a matched constant node into this class's column encoding.
    ///
    /// For user classes this performs the same cached lookup as
    /// [`match_node`](Self::match_node); a node that was confirmed to match
    /// but yields no row is a fatal mapping inconsistency.
    pub fn to_columns(
        &self,
        node: &Node,
        ctx: &TranslationContext<'_>,
    ) -> Result<Vec<Column>, FatalError> {
        Ok(match (self, node) {
            (ResourceClass::Iri | ResourceClass::UnsupportedIri, Node::Iri(iri)) => {
                vec![Column::Constant(format!(
                    "{}::varchar",
                    quote_string_literal(iri.as_str())
                ))]
            }
            (ResourceClass::Literal(class), Node::Literal(literal)) => {
                vec![Column::Constant(format!(
                    "{}::{}",
                    quote_string_literal(literal.value()),
                    class.sql_type()
                ))]
            }
            (ResourceClass::LangString(_), Node::Literal(literal)) => {
                vec![Column::Constant(format!(
                    "{}::varchar",
                    quote_string_literal(literal.value())
                ))]
            }
            (ResourceClass::UnsupportedLiteral, Node::Literal(literal)) => vec![
                Column::Constant(format!(
                    "{}::varchar",
                    quote_string_literal(literal.value())
                )),
                Column::Constant(format!(
                    "{}::varchar",
                    quote_string_literal(literal.datatype().as_str())
                )),
            ],
            (ResourceClass::User(class), Node::Iri(iri)) => {
                match ctx.resolve_user_class(class, iri.as_str())? {
                    Some(columns) => columns,
                    None => {
                        return Err(FatalError::InconsistentMapping {
                            iri: iri.as_str().to_owned(),
                            class: class.name().to_owned(),
                        })
                    }
                }
            }
            _ => Vec::new(),
        })
    }

    /// The boxed-container constructor lifting this class's parts into the
    /// polymorphic value representation.
    pub fn box_code(&self, parts: &[String]) -> String {
        match self {
            ResourceClass::Iri | ResourceClass::UnsupportedIri => {
                format!("sparql.rdfbox_from_iri({})", parts[0])
            }
            ResourceClass::BlankNode => format!("sparql.rdfbox_from_blanknode({})", parts[0]),
            ResourceClass::Literal(class) => {
                format!("sparql.rdfbox_from_{}({})", class.name(), parts[0])
            }
            ResourceClass::LangString(tag) => format!(
                "sparql.rdfbox_from_lang_string({}, {})",
                parts[0],
                quote_string_literal(tag)
            ),
            ResourceClass::UnsupportedLiteral => {
                format!("sparql.rdfbox_from_literal({}, {})", parts[0], parts[1])
            }
            ResourceClass::User(class) => {
                let iri = class.generate_function(&Column::Expression(parts[0].clone()));
                format!("sparql.rdfbox_from_iri({iri})")
            }
        }
    }

    /// The boxed-container extractors recovering this class's parts. The
    /// extraction yields NULL when the container holds a different class.
    pub fn extract_code(&self, boxed: &str) -> Vec<String> {
        match self {
            ResourceClass::Iri | ResourceClass::UnsupportedIri => {
                vec![format!("sparql.rdfbox_extract_iri({boxed})")]
            }
            ResourceClass::BlankNode => {
                vec![format!("sparql.rdfbox_extract_blanknode({boxed})")]
            }
            ResourceClass::Literal(class) => {
                vec![format!("sparql.rdfbox_extract_{}({boxed})", class.name())]
            }
            ResourceClass::LangString(tag) => vec![format!(
                "sparql.rdfbox_extract_lang_string({boxed}, {})",
                quote_string_literal(tag)
            )],
            ResourceClass::UnsupportedLiteral => vec![
                format!("sparql.rdfbox_extract_literal_value({boxed})"),
                format!("sparql.rdfbox_extract_literal_datatype({boxed})"),
            ],
            ResourceClass::User(class) => {
                let iri = Column::Expression(format!("sparql.rdfbox_extract_iri({boxed})"));
                vec![class.generate_inverse_function(&iri, true).to_string()]
            }
        }
    }

    /// The SQL expression projected for this class in the final result set.
    pub fn result_code(&self, parts: &[String]) -> String {
        match self {
            ResourceClass::User(class) => class
                .generate_function(&Column::Expression(parts[0].clone()))
                .to_string(),
            _ => parts[0].clone(),
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
