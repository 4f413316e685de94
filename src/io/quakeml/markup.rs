use std::io::Write;

use indexmap::IndexMap;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Error as XMLError, Writer};

macro_rules! bstart {
    ($e:expr) => {
        BytesStart::from_content($e, $e.len())
    };
}

macro_rules! attrib {
    ($name:expr, $value:expr, $elt:ident) => {
        let key = $name.as_str();
        let value = $value.as_str();
        $elt.push_attribute((key, value));
    };
}

/// What an element holds between its start and end tags. Text and child elements
/// are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum TagContent {
    #[default]
    Empty,
    Text(String),
    Children(Vec<Tag>),
}

/// A minimal in-memory XML element, built up front and serialized in one pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub content: TagContent,
}

impl Tag {
    pub fn new<S: ToString>(name: S) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_text<S: ToString, T: ToString>(name: S, text: T) -> Self {
        let mut tag = Self::new(name);
        tag.set_text(text);
        tag
    }

    pub fn set_attribute<K: ToString, V: ToString>(&mut self, key: K, value: V) -> &mut Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    /// Set the text of this element, discarding any children
    pub fn set_text<T: ToString>(&mut self, text: T) -> &mut Self {
        self.content = TagContent::Text(text.to_string());
        self
    }

    /// Append a child element, discarding any text
    pub fn add_child(&mut self, child: Tag) -> &mut Self {
        match &mut self.content {
            TagContent::Children(children) => children.push(child),
            content => *content = TagContent::Children(vec![child]),
        }
        self
    }

    pub fn children(&self) -> &[Tag] {
        match &self.content {
            TagContent::Children(children) => children,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TagContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut Writer<W>) -> Result<(), XMLError> {
        let mut elt = bstart!(self.name.as_str());
        for (key, value) in self.attributes.iter() {
            attrib!(key, value, elt);
        }
        match &self.content {
            TagContent::Empty => {
                writer.write_event(Event::Empty(elt))?;
            }
            TagContent::Text(text) => {
                writer.write_event(Event::Start(elt))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
            }
            TagContent::Children(children) => {
                writer.write_event(Event::Start(elt))?;
                for child in children {
                    child.write_to(writer)?;
                }
                writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
            }
        }
        Ok(())
    }

    /// Render this element and its descendants without an XML declaration
    pub fn to_xml_string(&self) -> Result<String, XMLError> {
        let mut writer = Writer::new(Vec::new());
        self.write_to(&mut writer)?;
        Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
    }
}
