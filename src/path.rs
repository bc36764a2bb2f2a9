//! Grammar of SensorThings resource paths.
//!
//! A path is handed to us by the HTTP layer in up to three components:
//!
//! ```text
//! {entitySet}[({id})] [/ {NestedSet} | / {attribute}] [/ $value | / $ref]
//! ```
//!
//! Whether the second component names a related entity set or an attribute is
//! decided by its first character alone: uppercase means entity set, anything
//! else (lowercase, `@`, digits) means attribute. Clients depend on this rule.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // everything before the first '(' is the name, the id runs to the closing ')'
    static ref COMPONENT: Regex = Regex::new(r"^(?P<name>[^()]*)\((?P<id>.*)\)$").unwrap();
    static ref QUOTED: Regex = Regex::new(r"^'(?P<inner>.*)'$").unwrap();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntitySet {
    Things,
    Locations,
    HistoricalLocations,
    Datastreams,
    Sensors,
    Observations,
    ObservedProperties,
    FeaturesOfInterest,
}

impl EntitySet {
    pub const ALL: [EntitySet; 8] = [
        EntitySet::Things,
        EntitySet::Locations,
        EntitySet::HistoricalLocations,
        EntitySet::Datastreams,
        EntitySet::Sensors,
        EntitySet::Observations,
        EntitySet::ObservedProperties,
        EntitySet::FeaturesOfInterest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            EntitySet::Things => "Things",
            EntitySet::Locations => "Locations",
            EntitySet::HistoricalLocations => "HistoricalLocations",
            EntitySet::Datastreams => "Datastreams",
            EntitySet::Sensors => "Sensors",
            EntitySet::Observations => "Observations",
            EntitySet::ObservedProperties => "ObservedProperties",
            EntitySet::FeaturesOfInterest => "FeaturesOfInterest",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|set| set.name() == name)
    }
}

/// Related entities reachable from an entity, singular where the relation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nested {
    Thing,
    Locations,
    HistoricalLocations,
    Datastream,
    Datastreams,
    Sensor,
    ObservedProperty,
    Observations,
    FeatureOfInterest,
}

impl Nested {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "Thing" => Nested::Thing,
            "Locations" => Nested::Locations,
            "HistoricalLocations" => Nested::HistoricalLocations,
            "Datastream" => Nested::Datastream,
            "Datastreams" => Nested::Datastreams,
            "Sensor" => Nested::Sensor,
            "ObservedProperty" => Nested::ObservedProperty,
            "Observations" => Nested::Observations,
            "FeatureOfInterest" => Nested::FeatureOfInterest,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    NestedSet,
    Attribute,
}

/// Uppercase first character: entity set. Everything else: attribute.
pub fn classify(segment: &str) -> SegmentKind {
    match segment.chars().next() {
        Some(c) if c.is_uppercase() => SegmentKind::NestedSet,
        _ => SegmentKind::Attribute,
    }
}

/// Splits `Name(id)` into its name and id. Without parentheses the id is empty.
pub fn split_component(component: &str) -> (&str, &str) {
    match COMPONENT.captures(component) {
        Some(caps) => {
            let name = caps.name("name").map_or("", |m| m.as_str());
            let id = caps.name("id").map_or("", |m| m.as_str());
            // OData string keys come quoted
            let id = QUOTED
                .captures(id)
                .and_then(|q| q.name("inner"))
                .map_or(id, |m| m.as_str());
            (name, id)
        }
        None => (component, ""),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Nested { name: String, id: String },
    Attribute(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Qualifier {
    #[default]
    None,
    Value,
    Ref,
}

/// A parsed path. The entity set is kept as written; recognizing it is
/// left to the resolver, which answers unknown names with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    pub entity_set: String,
    pub id: String,
    pub segment: Option<Segment>,
    pub qualifier: Qualifier,
}

impl ResourcePath {
    pub fn nested(&self) -> Option<(&str, &str)> {
        match &self.segment {
            Some(Segment::Nested { name, id }) => Some((name.as_str(), id.as_str())),
            _ => None,
        }
    }
    pub fn attribute(&self) -> Option<&str> {
        match &self.segment {
            Some(Segment::Attribute(name)) => Some(name.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathRejection {
    /// Trailing token other than `$value`/`$ref`, or one that does not fit the segment.
    WrongParam(String),
    /// An id on the nested segment.
    NestedId { nested: String, id: String },
}

fn blank(part: Option<&str>) -> Option<&str> {
    part.map(str::trim).filter(|p| !p.is_empty())
}

pub fn parse(
    param: &str,
    nest: Option<&str>,
    subrequest: Option<&str>,
) -> Result<ResourcePath, PathRejection> {
    let (entity_set, id) = split_component(param.trim());
    let segment = match blank(nest) {
        None => None,
        Some(part) => Some(match classify(part) {
            SegmentKind::NestedSet => {
                let (name, nested_id) = split_component(part);
                if !nested_id.is_empty() {
                    return Err(PathRejection::NestedId {
                        nested: name.to_string(),
                        id: nested_id.to_string(),
                    });
                }
                Segment::Nested { name: name.to_string(), id: String::new() }
            }
            SegmentKind::Attribute => Segment::Attribute(part.to_string()),
        }),
    };
    let qualifier = match blank(subrequest) {
        None => Qualifier::None,
        Some(token) => match (token, &segment) {
            ("$value", Some(Segment::Attribute(_))) => Qualifier::Value,
            ("$ref", Some(Segment::Nested { .. })) => Qualifier::Ref,
            (other, _) => return Err(PathRejection::WrongParam(other.to_string())),
        },
    };
    Ok(ResourcePath {
        entity_set: entity_set.to_string(),
        id: id.to_string(),
        segment,
        qualifier,
    })
}
