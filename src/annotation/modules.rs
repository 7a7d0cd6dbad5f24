/// KEGG-style module definitions and their completeness scores
///
/// A definition is a whitespace-separated list of steps. A step lists
/// alternatives separated by `,`; an alternative is a complex of ids joined
/// with `+` (required) or `-` (optional, not scored). Inside parentheses the
/// comma binds loosest: `(A B,C)` is "A then B" or "C". `--` marks a step
/// without a known id.
use crate::BinqcError;
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1, one_of},
    combinator::{all_consuming, map, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded},
    IResult,
};

#[derive(Debug, Clone, PartialEq)]
pub enum ModuleExpr {
    Ko(String),
    /// Every part needed; scored as the mean of the parts
    All(Vec<ModuleExpr>),
    /// Any part suffices; scored as the best part
    Any(Vec<ModuleExpr>),
    /// Placeholder step with no scorable id
    Gap,
}

impl ModuleExpr {
    /// Fraction of the expression satisfied, `None` when nothing is scorable
    pub fn score(&self, present: &dyn Fn(&str) -> bool) -> Option<f64> {
        match self {
            ModuleExpr::Ko(id) => Some(if present(id) { 1.0 } else { 0.0 }),
            ModuleExpr::Gap => None,
            ModuleExpr::All(parts) => {
                let scores: Vec<f64> = parts.iter().filter_map(|p| p.score(present)).collect();
                if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum::<f64>() / scores.len() as f64)
                }
            }
            ModuleExpr::Any(parts) => parts
                .iter()
                .filter_map(|p| p.score(present))
                .fold(None, |best: Option<f64>, s| Some(best.map_or(s, |b| b.max(s)))),
        }
    }

    /// All ids mentioned by the expression, in order of appearance
    pub fn ko_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            ModuleExpr::Ko(id) => out.push(id),
            ModuleExpr::Gap => {}
            ModuleExpr::All(parts) | ModuleExpr::Any(parts) => {
                for part in parts {
                    part.collect_ids(out);
                }
            }
        }
    }
}

fn collapse(mut parts: Vec<ModuleExpr>, wrap: fn(Vec<ModuleExpr>) -> ModuleExpr) -> ModuleExpr {
    if parts.len() == 1 {
        parts.remove(0)
    } else {
        wrap(parts)
    }
}

fn ko_id(input: &str) -> IResult<&str, ModuleExpr> {
    map(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
        |id: &str| ModuleExpr::Ko(id.to_string()),
    )(input)
}

fn atom(input: &str) -> IResult<&str, ModuleExpr> {
    alt((
        delimited(
            pair(char('('), multispace0),
            group,
            pair(multispace0, char(')')),
        ),
        value(ModuleExpr::Gap, tag("--")),
        ko_id,
    ))(input)
}

fn complex(input: &str) -> IResult<&str, ModuleExpr> {
    let (input, first) = atom(input)?;
    let (input, rest) = many0(pair(one_of("+-"), atom))(input)?;

    let mut parts = vec![first];
    parts.extend(
        rest.into_iter()
            .filter(|(op, _)| *op == '+')
            .map(|(_, expr)| expr),
    );
    Ok((input, collapse(parts, ModuleExpr::All)))
}

fn alternatives(input: &str) -> IResult<&str, ModuleExpr> {
    map(
        separated_list1(preceded(multispace0, char(',')), preceded(multispace0, complex)),
        |parts| collapse(parts, ModuleExpr::Any),
    )(input)
}

/// Space-separated complexes inside a group, all required
fn sequence(input: &str) -> IResult<&str, ModuleExpr> {
    map(separated_list1(multispace1, complex), |parts| {
        collapse(parts, ModuleExpr::All)
    })(input)
}

/// Parenthesised body: comma-separated sequences, any one suffices
fn group(input: &str) -> IResult<&str, ModuleExpr> {
    map(
        separated_list1(delimited(multispace0, char(','), multispace0), sequence),
        |parts| collapse(parts, ModuleExpr::Any),
    )(input)
}

fn steps(input: &str) -> IResult<&str, ModuleExpr> {
    map(separated_list1(multispace1, alternatives), |parts| {
        collapse(parts, ModuleExpr::All)
    })(input)
}

/// Parse a full module definition string
pub fn parse_module_definition(definition: &str) -> Result<ModuleExpr, BinqcError> {
    all_consuming(delimited(multispace0, steps, multispace0))(definition)
        .map(|(_, expr)| expr)
        .map_err(|e| BinqcError::Parse(format!("invalid module definition '{}': {:?}", definition, e)))
}
