//! Generic XML element tree, arena-allocated.
//!
//! Rack presets are schema-loose XML: the parser first materializes the whole
//! document as a flat arena of elements with index-based children, then walks
//! it. Arena indices double as stable element identities, which is what the
//! structure walker uses to detect reference cycles.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::parser::ParseError;

/// Index of an element inside an [`XmlTree`] arena.
pub type NodeId = usize;

/// A single XML element: tag, attributes in document order, child indices.
#[derive(Clone, Debug)]
pub struct XmlElement {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
}

impl XmlElement {
    /// First attribute with the given name, if any.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Arena of elements with a single document root.
#[derive(Clone, Debug)]
pub struct XmlTree {
    elements: Vec<XmlElement>,
    root: NodeId,
}

impl XmlTree {
    /// Parse XML text into an element tree.
    ///
    /// The only failure mode is malformed XML; unknown tags and attributes
    /// are preserved as-is for the structure walker to judge.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut elements: Vec<XmlElement> = Vec::new();
        let mut root: Option<NodeId> = None;
        let mut stack: Vec<NodeId> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let id = push_element(&mut elements, &mut root, &stack, e)?;
                    stack.push(id);
                }
                Ok(Event::Empty(ref e)) => {
                    push_element(&mut elements, &mut root, &stack, e)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop().ok_or_else(|| {
                        ParseError::MalformedXml("unbalanced closing tag".to_string())
                    })?;
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => return Err(ParseError::MalformedXml(e.to_string())),
            }
        }

        if !stack.is_empty() {
            return Err(ParseError::MalformedXml("unclosed element".to_string()));
        }
        let root =
            root.ok_or_else(|| ParseError::MalformedXml("missing root element".to_string()))?;
        Ok(Self { elements, root })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> &XmlElement {
        &self.elements[id]
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Iterate every element in the arena with its id.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &XmlElement)> {
        self.elements.iter().enumerate()
    }

    /// Depth-first search for the first descendant of `from` with `tag`.
    pub fn find_first(&self, from: NodeId, tag: &str) -> Option<NodeId> {
        let mut pending: Vec<NodeId> = self.get(from).children.iter().rev().copied().collect();
        while let Some(id) = pending.pop() {
            if self.get(id).tag == tag {
                return Some(id);
            }
            pending.extend(self.get(id).children.iter().rev().copied());
        }
        None
    }
}

fn push_element(
    elements: &mut Vec<XmlElement>,
    root: &mut Option<NodeId>,
    stack: &[NodeId],
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<NodeId, ParseError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut attributes = Vec::new();
    for attr in start.attributes().flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let val = String::from_utf8_lossy(&attr.value).to_string();
        attributes.push((key, val));
    }

    let id = elements.len();
    elements.push(XmlElement {
        tag,
        attributes,
        children: Vec::new(),
    });

    match stack.last() {
        Some(&parent) => elements[parent].children.push(id),
        None => {
            if root.is_some() {
                return Err(ParseError::MalformedXml(
                    "multiple root elements".to_string(),
                ));
            }
            *root = Some(id);
        }
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_nested_elements() {
        let tree = XmlTree::parse(
            r#"<Root><Chain Name="a"><Reverb DryWet="0.5"/></Chain></Root>"#,
        )
        .unwrap();
        let root = tree.get(tree.root());
        assert_eq!(root.tag, "Root");
        assert_eq!(root.children.len(), 1);

        let chain = tree.get(root.children[0]);
        assert_eq!(chain.tag, "Chain");
        assert_eq!(chain.attr("Name"), Some("a"));

        let reverb = tree.get(chain.children[0]);
        assert_eq!(reverb.tag, "Reverb");
        assert_eq!(reverb.attr("DryWet"), Some("0.5"));
    }

    #[test]
    fn test_rejects_malformed_xml() {
        assert!(matches!(
            XmlTree::parse("<Root><Chain></Root>"),
            Err(ParseError::MalformedXml(_))
        ));
        assert!(matches!(
            XmlTree::parse("not xml at all"),
            Err(ParseError::MalformedXml(_))
        ));
        assert!(matches!(
            XmlTree::parse(""),
            Err(ParseError::MalformedXml(_))
        ));
    }

    #[test]
    fn test_find_first_descends_depth_first() {
        let tree = XmlTree::parse(
            "<Root><A><Target Id=\"deep\"/></A><Target Id=\"shallow\"/></Root>",
        )
        .unwrap();
        let hit = tree.find_first(tree.root(), "Target").unwrap();
        assert_eq!(tree.get(hit).attr("Id"), Some("deep"));
    }

    #[test]
    fn test_attribute_order_preserved() {
        let tree = XmlTree::parse(r#"<Root><D Z="1" A="2"/></Root>"#).unwrap();
        let d = tree.get(tree.get(tree.root()).children[0]);
        assert_eq!(d.attributes[0].0, "Z");
        assert_eq!(d.attributes[1].0, "A");
    }
}
