/// STL parser for binary and ASCII formats
use nom::{
    bytes::complete::{tag, take},
    character::complete::{line_ending, multispace0, multispace1, not_line_ending},
    combinator::{all_consuming, opt},
    multi::{count, many0},
    number::complete::{float, le_f32, le_u16, le_u32},
    sequence::{preceded, terminated, tuple},
    IResult,
};

use crate::error::IngestError;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One STL facet: stored normal and three corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: [f32; 3],
    pub corners: [[f32; 3]; 3],
}

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Vec<Facet>, IngestError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(IngestError::Stl("file too small to be a valid STL".to_string()));
    }

    let (body, facet_count) = preceded(take(HEADER_LEN), le_u32)(data).map_err(stl_error)?;
    let facet_count = facet_count as usize;

    // Checked up front so a lying header cannot trigger a huge allocation.
    let needed = facet_count.saturating_mul(FACET_LEN);
    if body.len() < needed {
        return Err(IngestError::Stl(format!(
            "header declares {facet_count} facets but only {} bytes follow",
            body.len()
        )));
    }

    let (_, facets) = count(binary_facet, facet_count)(body).map_err(stl_error)?;
    Ok(facets)
}

fn binary_facet(input: &[u8]) -> IResult<&[u8], Facet> {
    let (input, normal) = le_vec3(input)?;
    let (input, a) = le_vec3(input)?;
    let (input, b) = le_vec3(input)?;
    let (input, c) = le_vec3(input)?;
    let (input, _attribute_bytes) = le_u16(input)?;
    Ok((
        input,
        Facet {
            normal,
            corners: [a, b, c],
        },
    ))
}

fn le_vec3(input: &[u8]) -> IResult<&[u8], [f32; 3]> {
    let (input, (x, y, z)) = tuple((le_f32, le_f32, le_f32))(input)?;
    Ok((input, [x, y, z]))
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Vec<Facet>, IngestError> {
    match all_consuming(ascii_solid)(input) {
        Ok((_, facets)) => Ok(facets),
        Err(e) => Err(IngestError::Stl(format!(
            "failed to parse ASCII STL: {}",
            describe(e, str::len)
        ))),
    }
}

fn ascii_solid(input: &str) -> IResult<&str, Vec<Facet>> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _name) = terminated(not_line_ending, opt(line_ending))(input)?;
    let (input, facets) = many0(ascii_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = multispace0(input)?;
    Ok((input, facets))
}

fn ascii_facet(input: &str) -> IResult<&str, Facet> {
    let (input, _) = tuple((multispace0, tag("facet"), multispace1, tag("normal")))(input)?;
    let (input, normal) = ascii_vec3(input)?;
    let (input, _) = tuple((multispace0, tag("outer"), multispace1, tag("loop")))(input)?;
    let (input, a) = ascii_vertex(input)?;
    let (input, b) = ascii_vertex(input)?;
    let (input, c) = ascii_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;
    Ok((
        input,
        Facet {
            normal,
            corners: [a, b, c],
        },
    ))
}

fn ascii_vertex(input: &str) -> IResult<&str, [f32; 3]> {
    preceded(preceded(multispace0, tag("vertex")), ascii_vec3)(input)
}

fn ascii_vec3(input: &str) -> IResult<&str, [f32; 3]> {
    let (input, (_, x, _, y, _, z)) =
        tuple((multispace1, float, multispace1, float, multispace1, float))(input)?;
    Ok((input, [x, y, z]))
}

fn stl_error(e: nom::Err<nom::error::Error<&[u8]>>) -> IngestError {
    IngestError::Stl(describe(e, <[u8]>::len))
}

fn describe<I: Copy>(e: nom::Err<nom::error::Error<I>>, remaining: impl Fn(I) -> usize) -> String {
    match e {
        nom::Err::Incomplete(_) => "unexpected end of file".to_string(),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            format!("{:?} with {} bytes left", e.code, remaining(e.input))
        }
    }
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Vec<Facet>, IngestError> {
    // Binary files may also start with "solid"; fall back when ASCII fails.
    if looks_ascii(data) {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(facets) = parse_ascii_stl(text) {
                return Ok(facets);
            }
        }
    }

    parse_binary_stl(data)
}

/// Whether the bytes start like an ASCII STL.
pub fn looks_ascii(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    data[start..].starts_with(b"solid")
}
