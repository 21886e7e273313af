//! GINI code tables.
//!
//! Translate the numeric creating-entity, sector and physical-element codes
//! of the product description block into readable names and units.
//! Entity 99 marks the Unidata radar mosaics, which reuse some element
//! codes with different meanings.

use std::borrow::Cow;

/// Entity code of the Unidata radar mosaic composites.
pub const RADAR_MOSAIC_ENTITY: u8 = 99;

/// Creating entity (satellite or composite source).
pub fn entity_name(entity_id: u8) -> &'static str {
    match entity_id {
        2 => "Miscellaneous",
        3 => "JERS",
        4 => "ERS/QuikSCAT/Scatterometer",
        5 => "POES/NPOESS",
        6 => "Composite",
        7 => "DMSP satellite Image",
        8 => "GMS satellite Image",
        9 => "METEOSAT satellite Image",
        10 => "GOES-7 satellite Image",
        11 => "GOES-8 satellite Image",
        12 => "GOES-9 satellite Image",
        13 => "GOES-10 satellite Image",
        14 => "GOES-11 satellite Image",
        15 => "GOES-12 satellite Image",
        16 => "GOES-13 satellite Image",
        17 => "GOES-14 satellite Image",
        18 => "GOES-15 satellite Image",
        19 => "GOES-16 satellite Image",
        RADAR_MOSAIC_ENTITY => "RADAR-MOSIAC Composite Image",
        _ => "Unknown",
    }
}

/// Geographic sector covered by the product.
pub fn sector_name(sector_id: u8) -> &'static str {
    match sector_id {
        0 => "Northern Hemisphere Composite",
        1 => "East CONUS",
        2 => "West CONUS",
        3 => "Alaska Regional",
        4 => "Alaska National",
        5 => "Hawaii Regional",
        6 => "Hawaii National",
        7 => "Puerto Rico Regional",
        8 => "Puerto Rico National",
        9 => "Supernational",
        10 => "NH Composite - Meteosat/GOES E/ GOES W/GMS",
        11 => "Central CONUS",
        12 => "East Floater",
        13 => "West Floater",
        14 => "Central Floater",
        15 => "Polar Floater",
        _ => "Unknown-ID",
    }
}

/// Short variable name for a physical element.
pub fn physical_element_id(element: u8, entity_id: u8) -> &'static str {
    let mosaic = entity_id == RADAR_MOSAIC_ENTITY;
    match element {
        1 => "VIS",
        3 => "IR_WV",
        2 | 4..=7 => "IR",
        13 | 16 => "LI",
        14 | 17 => "PW",
        15 | 18 => "SFC_T",
        19 => "CAPE",
        20 => "T",
        21 => "WINDEX",
        22 => "DMPI",
        23 => "MDPI",
        25 if mosaic => "HHC",
        25 => "Volcano_imagery",
        26 => "EchoTops",
        27 | 28 if mosaic => "Reflectivity",
        27 => "CTP",
        28 => "Cloud_Amount",
        29 => "VIL",
        30 | 31 => "Precipitation",
        40..=58 => "sounder_imagery",
        59 => "VIS_sounder",
        _ => "Unknown",
    }
}

/// Descriptive name for a physical element.
pub fn physical_element_long_name(element: u8, entity_id: u8) -> Cow<'static, str> {
    let mosaic = entity_id == RADAR_MOSAIC_ENTITY;
    let name = match element {
        1 => "Imager Visible",
        2 => "Imager 3.9 micron IR",
        3 => "Imager 6.7/6.5 micron IR (WV)",
        4 => "Imager 11 micron IR",
        5 => "Imager 12 micron IR",
        6 => "Imager 13 micron IR",
        7 => "Imager 1.3 micron IR",
        13 | 16 => "Lifted Index LI",
        14 | 17 => "Precipitable Water PW",
        15 | 18 => "Surface Skin Temperature",
        19 => "Convective Available Potential Energy",
        20 => "land-sea Temperature",
        21 => "Wind Index",
        22 => "Dry Microburst Potential Index",
        23 => "Microburst Potential Index",
        25 if mosaic => "2 km National 248 nm Base Composite Reflectivity",
        25 => "Volcano_imagery",
        26 => "4 km National Echo Tops",
        27 if mosaic => "1 km National Base Reflectivity Composite (Unidata)",
        27 => "Cloud Top Pressure or Height",
        28 if mosaic => "1 km National Composite Reflectivity (Unidata)",
        28 => "Cloud Amount",
        29 => "4 km National Vertically Integrated Liquid Water",
        30 => "2 km National 1-hour Precipitation (Unidata)",
        31 => "4 km National Storm Total Precipitation (Unidata)",
        43 => "14.06 micron sounder image",
        48 => "11.03 micron sounder image",
        50 => "7.43 micron sounder image",
        51 => "7.02 micron sounder image",
        52 => "6.51 micron sounder image",
        55 => "4.45 micron sounder image",
        57 => "3.98 micron sounder image",
        59 => "VIS sounder image",
        other => return Cow::Owned(format!("unknown physical element {}", other)),
    };
    Cow::Borrowed(name)
}

/// Units of the (calibrated) physical element.
pub fn physical_element_units(element: u8, entity_id: u8) -> &'static str {
    let mosaic = entity_id == RADAR_MOSAIC_ENTITY;
    match element {
        1..=7 | 13..=23 | 29 | 43 | 48 | 50..=52 | 55 | 57 | 59 => "N/A",
        26 => "K FT",
        25 | 27 | 28 if mosaic => "dBz",
        25 | 27 | 28 => "N/A",
        30 | 31 => "IN",
        _ => "Unknown",
    }
}

/// Whether the element belongs to the precipitation family, which gets a
/// minimum calibration scale of 100.
pub fn is_precipitation(element: u8, entity_id: u8) -> bool {
    physical_element_id(element, entity_id) == "Precipitation"
}
