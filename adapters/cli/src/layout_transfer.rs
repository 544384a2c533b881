use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use hamlet_core::{CellCoord, Command, ObjectId, ObjectProfile};
use hamlet_world::{query, World};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const SNAPSHOT_DOMAIN: &str = "hamlet";
const SNAPSHOT_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded snapshot payload.
pub(crate) const SNAPSHOT_HEADER: &str = "hamlet:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Snapshot of the objects placed on a city grid.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CityLayoutSnapshot {
    /// Number of cell columns contained in the grid.
    pub(crate) width: u32,
    /// Number of cell rows contained in the grid.
    pub(crate) depth: u32,
    /// Objects composing the city captured by the snapshot.
    pub(crate) objects: Vec<CityLayoutObject>,
}

impl CityLayoutSnapshot {
    /// Captures every object currently placed in the world.
    #[must_use]
    pub(crate) fn capture(world: &World) -> Self {
        let (width, depth) = query::grid_view(world).dimensions();
        let objects = query::objects(world)
            .into_iter()
            .map(|snapshot| CityLayoutObject {
                object: snapshot.id,
                profile: snapshot.profile,
                cells: snapshot.cells,
            })
            .collect();

        Self {
            width,
            depth,
            objects,
        }
    }

    /// Commands that seed the captured objects into a world of matching size.
    #[must_use]
    pub(crate) fn seed_commands(&self) -> Vec<Command> {
        self.objects
            .iter()
            .map(|object| Command::SeedObject {
                object: object.object,
                profile: object.profile,
                cells: object.cells.clone(),
            })
            .collect()
    }

    /// Encodes the snapshot into a single-line string suitable for clipboard transfer.
    pub(crate) fn encode(&self) -> Result<String, LayoutTransferError> {
        let payload = SerializableSnapshot {
            objects: self.objects.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(LayoutTransferError::InvalidPayload)?;
        let encoded = STANDARD_NO_PAD.encode(json);
        Ok(format!(
            "{SNAPSHOT_HEADER}:{}x{}:{encoded}",
            self.width, self.depth
        ))
    }

    /// Decodes a snapshot from the provided string representation.
    pub(crate) fn decode(value: &str) -> Result<Self, LayoutTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(LayoutTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(LayoutTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(LayoutTransferError::MissingVersion)?;
        let dimensions = parts.next().ok_or(LayoutTransferError::MissingDimensions)?;
        let payload = parts.next().ok_or(LayoutTransferError::MissingPayload)?;

        if domain != SNAPSHOT_DOMAIN {
            return Err(LayoutTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SNAPSHOT_VERSION {
            return Err(LayoutTransferError::UnsupportedVersion(version.to_owned()));
        }

        let (width, depth) = parse_dimensions(dimensions)?;
        let bytes = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(LayoutTransferError::InvalidEncoding)?;
        let decoded: SerializableSnapshot =
            serde_json::from_slice(&bytes).map_err(LayoutTransferError::InvalidPayload)?;

        Ok(Self {
            width,
            depth,
            objects: decoded.objects,
        })
    }
}

/// Object description captured within a city snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct CityLayoutObject {
    /// Handle the object was placed under.
    pub(crate) object: ObjectId,
    /// Attributes of the object.
    pub(crate) profile: ObjectProfile,
    /// Cells occupied by the object.
    pub(crate) cells: Vec<CellCoord>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct SerializableSnapshot {
    objects: Vec<CityLayoutObject>,
}

/// Errors that can occur while encoding or decoding city transfer strings.
#[derive(Debug, Error)]
pub(crate) enum LayoutTransferError {
    /// The provided string was empty or contained only whitespace.
    #[error("clipboard payload was empty")]
    EmptyPayload,
    /// The prefix segment was missing from the encoded snapshot.
    #[error("layout string is missing the prefix")]
    MissingPrefix,
    /// The encoded snapshot did not contain a version segment.
    #[error("layout string is missing the version")]
    MissingVersion,
    /// The encoded snapshot did not include grid dimensions.
    #[error("layout string is missing the grid dimensions")]
    MissingDimensions,
    /// The encoded snapshot did not include the payload segment.
    #[error("layout string is missing the payload")]
    MissingPayload,
    /// The encoded snapshot used an unexpected prefix segment.
    #[error("layout prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The encoded snapshot used an unsupported version identifier.
    #[error("layout version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed from the encoded snapshot.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The base64 payload could not be decoded.
    #[error("could not decode layout payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not process layout payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<(u32, u32), LayoutTransferError> {
    let invalid = || LayoutTransferError::InvalidDimensions(dimensions.to_owned());
    let (width, depth) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let width = width.trim().parse::<u32>().map_err(|_| invalid())?;
    let depth = depth.trim().parse::<u32>().map_err(|_| invalid())?;
    if width == 0 || depth == 0 {
        return Err(invalid());
    }

    Ok((width, depth))
}

#[cfg(test)]
mod tests {
    use hamlet_core::{Event, GridConfig, GridLayout};
    use hamlet_world::apply;

    use super::*;

    fn city() -> World {
        let mut world =
            World::with_layout(GridConfig::default(), &GridLayout::rectangular(6, 4));
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PlaceObject {
                object: ObjectId::new(1),
                cells: vec![CellCoord::new(1, 1), CellCoord::new(2, 1)],
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::SeedObject {
                object: ObjectId::new(40),
                profile: ObjectProfile::obstacle(true),
                cells: vec![CellCoord::new(5, 3)],
            },
            &mut events,
        );
        world
    }

    #[test]
    fn captured_city_survives_transfer() {
        let snapshot = CityLayoutSnapshot::capture(&city());
        assert_eq!(snapshot.objects.len(), 2);

        let encoded = snapshot.encode().expect("snapshot encodes");
        assert!(encoded.starts_with(&format!("{SNAPSHOT_HEADER}:6x4:")));

        let decoded = CityLayoutSnapshot::decode(&encoded).expect("snapshot decodes");
        assert_eq!(snapshot, decoded);
    }

    #[test]
    fn seeding_rebuilds_the_same_occupancy() {
        let original = city();
        let snapshot = CityLayoutSnapshot::capture(&original);

        let mut restored =
            World::with_layout(GridConfig::default(), &GridLayout::rectangular(6, 4));
        let mut events = Vec::new();
        for command in snapshot.seed_commands() {
            apply(&mut restored, command, &mut events);
        }

        assert!(!events
            .iter()
            .any(|event| matches!(event, Event::PlacementRejected { .. })));
        assert_eq!(query::objects(&restored), query::objects(&original));
    }

    #[test]
    fn malformed_strings_are_rejected() {
        assert!(matches!(
            CityLayoutSnapshot::decode("   "),
            Err(LayoutTransferError::EmptyPayload)
        ));
        assert!(matches!(
            CityLayoutSnapshot::decode("town:v1:4x4:e30"),
            Err(LayoutTransferError::InvalidPrefix(prefix)) if prefix == "town"
        ));
        assert!(matches!(
            CityLayoutSnapshot::decode("hamlet:v2:4x4:e30"),
            Err(LayoutTransferError::UnsupportedVersion(_))
        ));
        assert!(matches!(
            CityLayoutSnapshot::decode("hamlet:v1:0x4:e30"),
            Err(LayoutTransferError::InvalidDimensions(_))
        ));
        assert!(matches!(
            CityLayoutSnapshot::decode("hamlet:v1:4x4"),
            Err(LayoutTransferError::MissingPayload)
        ));
        assert!(matches!(
            CityLayoutSnapshot::decode("hamlet:v1:4x4:!!"),
            Err(LayoutTransferError::InvalidEncoding(_))
        ));
    }
}
