mod model;
mod parser;
mod tree;

pub use model::{category_of, Chain, Device, MacroControl, Rack};
pub use parser::{
    parse_rack, parse_rack_with_options, ParseError, ParseOptions, ParseWarning, ParsedRack,
};
pub use tree::{NodeId, XmlElement, XmlTree};
