use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_until, take_while, take_while1},
    character::complete::{char, multispace0, multispace1, satisfy},
    combinator::{map, recognize, value},
    multi::many0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::XmlError;

/// One element of an XML document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    /// In document order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    /// Concatenated character data, trimmed.
    pub text: String,
    /// 1-based line of the opening tag, 0 for elements built in code.
    pub line: usize,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(name, _)| *name == key) {
            Some(entry) => entry.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn push_child(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}

fn name(i: &str) -> IResult<&str, &str> {
    recognize(pair(satisfy(is_name_start), take_while(is_name_char)))(i)
}

fn comment(i: &str) -> IResult<&str, ()> {
    value((), tuple((tag("<!--"), take_until("-->"), tag("-->"))))(i)
}

fn processing_instruction(i: &str) -> IResult<&str, ()> {
    value((), tuple((tag("<?"), take_until("?>"), tag("?>"))))(i)
}

fn doctype(i: &str) -> IResult<&str, ()> {
    value((), tuple((tag("<!DOCTYPE"), take_until(">"), char('>'))))(i)
}

fn cdata(i: &str) -> IResult<&str, &str> {
    delimited(tag("<![CDATA["), take_until("]]>"), tag("]]>"))(i)
}

/// Whitespace, comments and processing instructions outside the root element.
fn misc(i: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            comment,
            processing_instruction,
            doctype,
        ))),
    )(i)
}

fn quoted(i: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('"'), take_till(|c| c == '"'), char('"')),
        delimited(char('\''), take_till(|c| c == '\''), char('\'')),
    ))(i)
}

fn attribute(i: &str) -> IResult<&str, (String, String)> {
    let (i, _) = multispace1(i)?;
    let (i, key) = name(i)?;
    let (i, _) = delimited(multispace0, char('='), multispace0)(i)?;
    let (i, raw) = quoted(i)?;
    Ok((i, (key.to_owned(), unescape(raw))))
}

#[derive(Debug, Clone)]
enum Content {
    Element(Element),
    Text(String),
    Ignored,
}

fn content(i: &str) -> IResult<&str, Content> {
    alt((
        value(Content::Ignored, comment),
        value(Content::Ignored, processing_instruction),
        map(cdata, |text| Content::Text(text.to_owned())),
        map(element, Content::Element),
        map(take_while1(|c| c != '<'), |text| Content::Text(unescape(text))),
    ))(i)
}

/// Parses one element. `line` temporarily holds the length of the remaining
/// input at the opening tag; [`parse_document`] turns it into a line number.
fn element(i: &str) -> IResult<&str, Element> {
    let remaining = i.len();
    let (i, _) = char('<')(i)?;
    let (i, tag_name) = name(i)?;
    let (i, attributes) = many0(attribute)(i)?;
    let (i, _) = multispace0(i)?;
    let (i, self_closing) = alt((value(true, tag("/>")), value(false, char('>'))))(i)?;

    let mut elem = Element {
        name: tag_name.to_owned(),
        attributes,
        children: vec![],
        text: String::new(),
        line: remaining,
    };
    if self_closing {
        return Ok((i, elem));
    }

    let (i, contents) = many0(content)(i)?;
    for content in contents {
        match content {
            Content::Element(child) => elem.children.push(child),
            Content::Text(text) => elem.text.push_str(&text),
            Content::Ignored => (),
        }
    }
    elem.text = elem.text.trim().to_owned();

    let (rest, closing) = preceded(tag("</"), name)(i)?;
    if closing != tag_name {
        return Err(nom::Err::Failure(nom::error::Error::new(
            i,
            nom::error::ErrorKind::Tag,
        )));
    }
    let (rest, _) = preceded(multispace0, char('>'))(rest)?;

    Ok((rest, elem))
}

fn unescape(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_owned();
    }
    let mut ret = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        ret.push_str(&rest[..start]);
        rest = &rest[start..];
        let decoded = rest.find(';').and_then(|end| {
            let entity = &rest[1..end];
            let c = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                _ => entity
                    .strip_prefix("#x")
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| entity.strip_prefix('#').map(|dec| dec.parse()))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            c.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                ret.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                // Not an entity we know, keep it verbatim
                ret.push('&');
                rest = &rest[1..];
            }
        }
    }
    ret.push_str(rest);
    ret
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())].matches('\n').count() + 1
}

fn assign_lines(elem: &mut Element, source: &str) {
    elem.line = line_at(source, source.len() - elem.line);
    for child in &mut elem.children {
        assign_lines(child, source);
    }
}

fn describe(input: &str, kind: nom::error::ErrorKind) -> String {
    let near: String = input.lines().next().unwrap_or("").chars().take(24).collect();
    if near.is_empty() {
        return "unexpected end of document".to_owned();
    }
    match kind {
        nom::error::ErrorKind::Tag if input.starts_with("</") => {
            format!("mismatched closing tag near {:?}", near)
        }
        _ => format!("unexpected input near {:?}", near),
    }
}

/// Parses a whole document and returns its root element.
pub fn parse_document(source: &str) -> Result<Element, XmlError> {
    let to_error = |input: &str, message: String| XmlError {
        line: line_at(source, source.len() - input.len()),
        message,
    };

    match tuple((misc, element, misc))(source) {
        Ok((rest, (_, mut root, _))) => {
            if !rest.is_empty() {
                return Err(to_error(rest, "content after the root element".to_owned()));
            }
            assign_lines(&mut root, source);
            Ok(root)
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(to_error(e.input, describe(e.input, e.code)))
        }
        Err(nom::Err::Incomplete(_)) => Err(to_error("", "unexpected end of document".to_owned())),
    }
}

#[cfg(test)]
mod test;
