use glam::{DVec3, Vec2, Vec3};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, i32 as int, multispace1, not_line_ending},
    combinator::{eof, map, opt, value},
    multi::{count, many0, many1},
    number::complete::double,
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use crate::error::BspError;

use super::{Entity, MapBrush, MapFace, MapPatch, PatchControl, TextureProjection};

// whitespace and // comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), pair(tag("//"), not_line_ending)),
        ))),
    )(input)
}

fn token<'a, O, F>(parser: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    terminated(parser, ws)
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    token(char(c))
}

fn number(input: &str) -> IResult<&str, f64> {
    token(double)(input)
}

// "name" "value"
fn quoted(input: &str) -> IResult<&str, &str> {
    token(delimited(char('"'), take_while(|c| c != '"'), char('"')))(input)
}

fn bare_word(input: &str) -> IResult<&str, &str> {
    token(take_while1(|c: char| {
        !c.is_whitespace() && c != '(' && c != ')' && c != '{' && c != '}' && c != '"'
    }))(input)
}

fn vector3(input: &str) -> IResult<&str, DVec3> {
    map(
        delimited(symbol('('), count(number, 3), symbol(')')),
        |v| DVec3::new(v[0], v[1], v[2]),
    )(input)
}

fn points(input: &str) -> IResult<&str, [DVec3; 3]> {
    map(tuple((vector3, vector3, vector3)), |(a, b, c)| [a, b, c])(input)
}

// content flags, surface flags, value
fn face_flags(input: &str) -> IResult<&str, Option<[i32; 3]>> {
    opt(map(count(token(int), 3), |v| [v[0], v[1], v[2]]))(input)
}

// ( x y z ) ( x y z ) ( x y z ) shader xoff yoff rot xscale yscale [content surface value]
fn classic_face(input: &str) -> IResult<&str, MapFace> {
    map(
        tuple((points, bare_word, count(number, 5), face_flags)),
        |(points, shader, t, flags)| MapFace {
            points,
            shader: shader.to_owned(),
            projection: TextureProjection::Classic {
                shift: [t[0], t[1]],
                rotate: t[2],
                scale: [t[3], t[4]],
            },
            flags,
        },
    )(input)
}

// ( x y z ) ( x y z ) ( x y z ) ( ( a b c ) ( d e f ) ) shader [content surface value]
fn primitive_face(input: &str) -> IResult<&str, MapFace> {
    map(
        tuple((
            points,
            delimited(symbol('('), pair(vector3, vector3), symbol(')')),
            bare_word,
            face_flags,
        )),
        |(points, (s, t), shader, flags)| MapFace {
            points,
            shader: shader.to_owned(),
            projection: TextureProjection::Matrix([s.to_array(), t.to_array()]),
            flags,
        },
    )(input)
}

fn brush_def(input: &str) -> IResult<&str, MapBrush> {
    map(
        preceded(
            token(tag("brushDef")),
            delimited(symbol('{'), many1(primitive_face), symbol('}')),
        ),
        |faces| MapBrush { faces },
    )(input)
}

fn classic_brush(input: &str) -> IResult<&str, MapBrush> {
    map(many1(classic_face), |faces| MapBrush { faces })(input)
}

fn patch_control(input: &str) -> IResult<&str, PatchControl> {
    map(
        delimited(symbol('('), count(number, 5), symbol(')')),
        |v| PatchControl {
            position: Vec3::new(v[0] as f32, v[1] as f32, v[2] as f32),
            uv: Vec2::new(v[3] as f32, v[4] as f32),
        },
    )(input)
}

// patchDef2 { shader ( width height 0 0 0 ) ( ( ctrl.. ) .. ) }
fn patch_def(input: &str) -> IResult<&str, MapPatch> {
    let (input, _) = token(tag("patchDef2"))(input)?;
    let (input, _) = symbol('{')(input)?;
    let (input, shader) = bare_word(input)?;
    let (input, info) = delimited(symbol('('), count(token(int), 5), symbol(')'))(input)?;
    let (width, height) = (info[0].max(0) as usize, info[1].max(0) as usize);
    let (input, columns) = delimited(
        symbol('('),
        count(
            delimited(symbol('('), count(patch_control, height), symbol(')')),
            width,
        ),
        symbol(')'),
    )(input)?;
    let (input, _) = symbol('}')(input)?;

    // columns are grouped in the file, the grid is row major
    let mut controls = Vec::with_capacity(width * height);
    for row in 0..height {
        for column in &columns {
            controls.push(column[row]);
        }
    }
    Ok((
        input,
        MapPatch {
            shader: shader.to_owned(),
            width,
            height,
            controls,
        },
    ))
}

enum Primitive {
    Brush(MapBrush),
    Patch(MapPatch),
}

fn primitive(input: &str) -> IResult<&str, Primitive> {
    delimited(
        symbol('{'),
        alt((
            map(brush_def, Primitive::Brush),
            map(patch_def, Primitive::Patch),
            map(classic_brush, Primitive::Brush),
        )),
        symbol('}'),
    )(input)
}

enum Item<'a> {
    Property(&'a str, &'a str),
    Primitive(Primitive),
}

fn entity(input: &str) -> IResult<&str, Entity> {
    map(
        delimited(
            symbol('{'),
            many0(alt((
                map(pair(quoted, quoted), |(k, v)| Item::Property(k, v)),
                map(primitive, Item::Primitive),
            ))),
            symbol('}'),
        ),
        |items| {
            let mut entity = Entity::default();
            for item in items {
                match item {
                    Item::Property(key, value) => {
                        entity.properties.push((key.to_owned(), value.to_owned()))
                    }
                    Item::Primitive(Primitive::Brush(brush)) => entity.brushes.push(brush),
                    Item::Primitive(Primitive::Patch(patch)) => entity.patches.push(patch),
                }
            }
            entity
        },
    )(input)
}

fn entities(input: &str) -> IResult<&str, Vec<Entity>> {
    delimited(ws, many0(entity), eof)(input)
}

fn line_of(source: &str, rest: &str) -> usize {
    let consumed = source.len() - rest.len();
    source[..consumed].matches('\n').count() + 1
}

/// Parses MAP source text, or the entity lump of a compiled level.
pub fn parse_entities(source: &str) -> Result<Vec<Entity>, BspError> {
    match entities(source) {
        Ok((_, entities)) => Ok(entities),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            // many0 stops at the first entity it cannot read, so the failure lands at its start
            let rest = e.input;
            let line = line_of(source, rest);
            let near: String = rest.chars().take(24).collect();
            Err(BspError::Map {
                line,
                message: format!("unexpected input near {near:?}"),
            })
        }
        Err(nom::Err::Incomplete(_)) => Err(BspError::Map {
            line: line_of(source, ""),
            message: "unexpected end of input".to_owned(),
        }),
    }
}
