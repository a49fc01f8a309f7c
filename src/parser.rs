//! `parser` contains the generated parser for catalog column type strings and tests on it.

#[allow(unused_imports)]
use pest::Parser; // This needs to be in scope for the next statements to work.
#[derive(Parser)]
#[grammar = "column_type.pest"]
pub struct ColumnTypeParser;

/// One argument of a parameterized type, e.g. the `10` and `2` of `decimal(10,2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeArg {
    Int(u32),
    Max,
}

/// A type string split into its lowercased name and arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeString {
    pub name: String,
    pub args: Vec<TypeArg>,
}

/// Splits a column type string like `nvarchar(max)` into name and arguments.
///
/// Returns `None` when the string is not of the form `name` or `name(arg, ...)`.
pub fn parse_type_string(s: &str) -> Option<TypeString> {
    let column_type = ColumnTypeParser::parse(Rule::column_type, s).ok()?.next()?;
    let mut name = String::new();
    let mut args = vec![];
    for pair in column_type.into_inner() {
        match pair.as_rule() {
            Rule::type_name => name = pair.as_str().to_lowercase(),
            Rule::arguments => {
                for arg in pair.into_inner() {
                    match arg.as_rule() {
                        Rule::integer => args.push(TypeArg::Int(arg.as_str().parse().ok()?)),
                        Rule::max_length => args.push(TypeArg::Max),
                        _ => unreachable!(),
                    }
                }
            }
            Rule::EOI => (),
            _ => unreachable!(),
        }
    }
    Some(TypeString { name, args })
}

#[test]
fn test_parse_type_strings() {
    let cases = vec![
        ("int", "int", vec![]),
        ("INT", "int", vec![]),
        ("decimal(10,2)", "decimal", vec![TypeArg::Int(10), TypeArg::Int(2)]),
        ("decimal( 10 , 2 )", "decimal", vec![TypeArg::Int(10), TypeArg::Int(2)]),
        ("nvarchar(max)", "nvarchar", vec![TypeArg::Max]),
        ("char(20)", "char", vec![TypeArg::Int(20)]),
        ("sql_variant", "sql_variant", vec![]),
    ];
    for (input, name, args) in cases {
        println!("Input: {}", input);
        let actual = parse_type_string(input).expect("Should have parsed type string.");
        assert_eq!(actual.name, name);
        assert_eq!(actual.args, args);
    }
}

#[test]
fn test_parse_bad_type_strings() {
    for input in ["", "(10)", "decimal(", "decimal(1,)", "int int", "char(-1)"] {
        assert!(parse_type_string(input).is_none(), "{} should not parse", input);
    }
}
