//! Namespace-agnostic element tree built on top of `quick-xml` events.
//!
//! eForms documents mix `cbc:`/`cac:`/`efac:` prefixes freely; every element is keyed by its
//! local name so lookups never depend on the prefix a publisher chose.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use super::NoticeError;

/// One element with its concatenated text and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct XmlElement {
    pub(crate) name: String,
    pub(crate) text: String,
    pub(crate) children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_start(start: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(start.local_name().as_ref()).into_owned(),
            ..Self::default()
        }
    }

    /// First direct child with the given local name.
    pub(crate) fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All direct children with the given local name.
    pub(crate) fn children_named<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// Follow a chain of first-match children.
    pub(crate) fn at(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |element, segment| element.child(segment))
    }

    /// Trimmed text at `path`, empty when any segment is missing.
    pub(crate) fn text_at(&self, path: &[&str]) -> String {
        self.at(path)
            .map(|element| element.text.trim().to_string())
            .unwrap_or_default()
    }
}

/// Local name of the document's root element, reading no further than its start tag.
pub(crate) fn root_name(xml: &[u8]) -> Result<String, NoticeError> {
    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                return Ok(XmlElement::from_start(&start).name);
            }
            Ok(Event::Eof) => return Err(NoticeError::Parse("document has no root element".into())),
            Ok(_) => continue,
            Err(err) => return Err(parse_error(&reader, err)),
        }
    }
}

/// Parse a complete, well-formed document into an element tree.
pub(crate) fn parse_document(xml: &[u8]) -> Result<XmlElement, NoticeError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(XmlElement::from_start(&start)),
            Ok(Event::Empty(start)) => {
                let element = XmlElement::from_start(&start);
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Text(text)) => {
                if let Some(current) = stack.last_mut() {
                    let value = text.unescape().map_err(|err| parse_error(&reader, err))?;
                    current.text.push_str(&value);
                }
            }
            Ok(Event::CData(data)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack.pop().ok_or_else(|| {
                    NoticeError::Parse("closing tag without matching opening tag".into())
                })?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => return Err(parse_error(&reader, err)),
        }
    }

    if let Some(open) = stack.last() {
        return Err(NoticeError::Parse(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    root.ok_or_else(|| NoticeError::Parse("document has no root element".into()))
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> Result<(), NoticeError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(NoticeError::Parse(format!(
                "multiple root elements (second is <{}>)",
                element.name
            )));
        }
    }
    Ok(())
}

fn parse_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> NoticeError {
    NoticeError::Parse(format!("at byte {}: {err}", reader.buffer_position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_name_ignores_prolog_and_prefix() {
        let xml = br#"<?xml version="1.0"?>
            <!-- notice -->
            <can:ContractAwardNotice xmlns:can="urn:x"><broken></can:ContractAwardNotice>"#;
        assert_eq!(root_name(xml).expect("root"), "ContractAwardNotice");
    }

    #[test]
    fn parses_prefixed_elements_by_local_name() {
        let xml = br#"<ContractNotice xmlns:cbc="urn:cbc" xmlns:cac="urn:cac">
            <cbc:ID>notice-1</cbc:ID>
            <cac:ProcurementProject>
                <cbc:Name>Stra&#223;enbau &amp; Tiefbau</cbc:Name>
                <cac:AdditionalCommodityClassification><cbc:ItemClassificationCode>A</cbc:ItemClassificationCode></cac:AdditionalCommodityClassification>
                <cac:AdditionalCommodityClassification><cbc:ItemClassificationCode>B</cbc:ItemClassificationCode></cac:AdditionalCommodityClassification>
                <cbc:Note/>
            </cac:ProcurementProject>
        </ContractNotice>"#;

        let root = parse_document(xml).expect("tree");
        assert_eq!(root.name, "ContractNotice");
        assert_eq!(root.text_at(&["ID"]), "notice-1");
        assert_eq!(
            root.text_at(&["ProcurementProject", "Name"]),
            "Straßenbau & Tiefbau"
        );
        let project = root.child("ProcurementProject").expect("project");
        let codes: Vec<String> = project
            .children_named("AdditionalCommodityClassification")
            .map(|element| element.text_at(&["ItemClassificationCode"]))
            .collect();
        assert_eq!(codes, vec!["A", "B"]);
        assert!(project.child("Note").is_some());
        assert_eq!(root.text_at(&["Missing", "Path"]), "");
    }

    #[test]
    fn mismatched_tags_are_parse_errors() {
        let err = parse_document(b"<ContractNotice><a></b></ContractNotice>").expect_err("error");
        assert!(matches!(err, NoticeError::Parse(_)));
    }

    #[test]
    fn truncated_documents_are_parse_errors() {
        let err = parse_document(b"<ContractNotice><ID>1</ID>").expect_err("error");
        assert!(matches!(err, NoticeError::Parse(_)));
    }
}
