// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The field descriptor table.

use crate::types::{RoomTemperature, WaterTemperature};

use super::{Access, DecodeRule, Field, FieldDescriptor, FieldKind, SourceKey, Unit};

const fn temperature(
    field: Field,
    register: Option<&'static str>,
    variable: &'static str,
    access: Access,
) -> FieldDescriptor {
    FieldDescriptor {
        field,
        kind: FieldKind::Temperature,
        unit: Some(Unit::Celsius),
        register: match register {
            Some(key) => Some(SourceKey::new(key, DecodeRule::LittleEndianTenths)),
            None => None,
        },
        variable: Some(SourceKey::new(variable, DecodeRule::SignedTenths)),
        access,
    }
}

const fn flag(field: Field, register: Option<&'static str>, variable: &'static str) -> FieldDescriptor {
    FieldDescriptor {
        field,
        kind: FieldKind::Flag,
        unit: None,
        register: match register {
            Some(key) => Some(SourceKey::new(key, DecodeRule::Boolean)),
            None => None,
        },
        variable: Some(SourceKey::new(variable, DecodeRule::Boolean)),
        access: Access::ReadOnly,
    }
}

/// Every field known to the library.
///
/// Register addresses were mapped against a live C.MI register dump; fields
/// without an address are only available through the EKD endpoint.
pub const FIELDS: &[FieldDescriptor] = &[
    temperature(
        Field::CurrentTemperature,
        Some("0c1c"),
        "TEMP_ROOM",
        Access::ReadOnly,
    ),
    temperature(
        Field::TargetTemperature,
        None,
        "ROOM_TEMP_SETTING",
        Access::ReadWrite(Some(RoomTemperature::RANGE)),
    ),
    temperature(
        Field::TargetTemperatureCo,
        Some("0bb8"),
        "CO_TEMP_SETTING",
        Access::ReadOnly,
    ),
    temperature(
        Field::TargetTemperatureCwu,
        Some("0bb9"),
        "CWU_TEMP_SETTING",
        Access::ReadWrite(Some(WaterTemperature::RANGE)),
    ),
    temperature(
        Field::WaterTemperature,
        Some("0c1d"),
        "TEMP_CWU",
        Access::ReadOnly,
    ),
    temperature(Field::OutsideTemperature, None, "TEMP_EXT", Access::ReadOnly),
    temperature(Field::ReturnTemperature, None, "TEMP_RETURN", Access::ReadOnly),
    flag(Field::HeaterRunning, Some("0b30"), "HEATER_ON"),
    flag(Field::PumpRunning, Some("0b31"), "PUMP_ON"),
    flag(Field::WaterHeating, None, "CWU_HEATING"),
    FieldDescriptor {
        field: Field::Mode,
        kind: FieldKind::Mode,
        unit: None,
        register: None,
        variable: Some(SourceKey::new("MODE", DecodeRule::Mode)),
        access: Access::ReadWrite(None),
    },
    FieldDescriptor {
        field: Field::Power,
        kind: FieldKind::Integer,
        unit: Some(Unit::Watt),
        register: None,
        variable: Some(SourceKey::new("POWER", DecodeRule::Raw)),
        access: Access::ReadOnly,
    },
    FieldDescriptor {
        field: Field::ErrorCode,
        kind: FieldKind::Integer,
        unit: None,
        register: None,
        variable: Some(SourceKey::new("ERROR_CODE", DecodeRule::Raw)),
        access: Access::ReadOnly,
    },
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::field::DataSource;

    #[test]
    fn every_field_has_exactly_one_descriptor() {
        let fields: Vec<Field> = FIELDS.iter().map(|d| d.field).collect();
        let unique: HashSet<Field> = fields.iter().copied().collect();
        assert_eq!(fields.len(), unique.len());
        assert_eq!(unique.len(), 13);
    }

    #[test]
    fn rule_kinds_match_descriptor_kind() {
        for descriptor in FIELDS {
            for source in [DataSource::Ekd, DataSource::Registers] {
                if let Some(key) = descriptor.key_for(source) {
                    assert_eq!(
                        key.rule.kind(),
                        descriptor.kind,
                        "{} / {}",
                        descriptor.field,
                        source.as_str()
                    );
                }
            }
        }
    }

    #[test]
    fn register_keys_are_lowercase_hex() {
        for key in FIELDS.iter().filter_map(|d| d.register) {
            assert_eq!(key.key.len(), 4);
            assert!(key.key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        }
    }

    #[test]
    fn only_setpoints_and_mode_are_writable() {
        let writable: Vec<Field> = FIELDS
            .iter()
            .filter(|d| d.access.is_writable())
            .map(|d| d.field)
            .collect();
        assert_eq!(
            writable,
            vec![
                Field::TargetTemperature,
                Field::TargetTemperatureCwu,
                Field::Mode
            ]
        );
    }

    #[test]
    fn descriptor_lookup() {
        assert_eq!(Field::Power.descriptor().unit, Some(Unit::Watt));
        assert_eq!(
            Field::HeaterRunning.descriptor().register.unwrap().key,
            "0b30"
        );
    }
}
