use crate::common::{
    slots_per_block, AttrType, Attribute, BlockNum, Result, StoreError, ATTRCAT_ATTR_NAME_INDEX,
    ATTRCAT_ATTR_TYPE_INDEX, ATTRCAT_OFFSET_INDEX, ATTRCAT_PRIMARY_FLAG_INDEX,
    ATTRCAT_REL_NAME_INDEX, ATTRCAT_ROOT_BLOCK_INDEX, CATALOG_NO_ATTRS,
    RELCAT_FIRST_BLOCK_INDEX, RELCAT_LAST_BLOCK_INDEX, RELCAT_NO_ATTRIBUTES_INDEX,
    RELCAT_NO_RECORDS_INDEX, RELCAT_NO_SLOTS_INDEX, RELCAT_REL_NAME_INDEX,
};

/// Attribute types of a relation catalog row
pub const RELCAT_ATTR_TYPES: [AttrType; CATALOG_NO_ATTRS] = [
    AttrType::Text,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
];

/// Attribute types of an attribute catalog row
pub const ATTRCAT_ATTR_TYPES: [AttrType; CATALOG_NO_ATTRS] = [
    AttrType::Text,
    AttrType::Text,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
    AttrType::Number,
];

fn corrupted(what: &str) -> StoreError {
    StoreError::CatalogCorrupted(what.to_string())
}

fn text_field(record: &[Attribute], index: usize, what: &str) -> Result<String> {
    record
        .get(index)
        .and_then(Attribute::as_text)
        .map(str::to_string)
        .ok_or_else(|| corrupted(what))
}

fn number_field(record: &[Attribute], index: usize, what: &str) -> Result<f64> {
    record
        .get(index)
        .and_then(Attribute::as_number)
        .ok_or_else(|| corrupted(what))
}

fn count_field(record: &[Attribute], index: usize, what: &str) -> Result<usize> {
    let n = number_field(record, index, what)?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(corrupted(what));
    }
    Ok(n as usize)
}

fn block_field(record: &[Attribute], index: usize, what: &str) -> Result<Option<BlockNum>> {
    let n = number_field(record, index, what)?;
    if n.fract() != 0.0 {
        return Err(corrupted(what));
    }
    Ok(BlockNum::from_link(n as i32))
}

fn block_value(block: Option<BlockNum>) -> Attribute {
    Attribute::Number(BlockNum::to_link(block) as f64)
}

/// A row of the relation catalog
#[derive(Debug, Clone, PartialEq)]
pub struct RelCatEntry {
    pub rel_name: String,
    pub num_attrs: usize,
    pub num_recs: usize,
    pub first_blk: Option<BlockNum>,
    pub last_blk: Option<BlockNum>,
    pub num_slots_per_blk: usize,
}

impl RelCatEntry {
    /// Row for a new, empty relation.
    pub fn new(rel_name: &str, num_attrs: usize) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            num_attrs,
            num_recs: 0,
            first_blk: None,
            last_blk: None,
            num_slots_per_blk: slots_per_block(num_attrs),
        }
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        Ok(Self {
            rel_name: text_field(record, RELCAT_REL_NAME_INDEX, "relation name")?,
            num_attrs: count_field(record, RELCAT_NO_ATTRIBUTES_INDEX, "attribute count")?,
            num_recs: count_field(record, RELCAT_NO_RECORDS_INDEX, "record count")?,
            first_blk: block_field(record, RELCAT_FIRST_BLOCK_INDEX, "first block")?,
            last_blk: block_field(record, RELCAT_LAST_BLOCK_INDEX, "last block")?,
            num_slots_per_blk: count_field(record, RELCAT_NO_SLOTS_INDEX, "slot count")?,
        })
    }

    pub fn to_record(&self) -> Vec<Attribute> {
        vec![
            Attribute::Text(self.rel_name.clone()),
            Attribute::Number(self.num_attrs as f64),
            Attribute::Number(self.num_recs as f64),
            block_value(self.first_blk),
            block_value(self.last_blk),
            Attribute::Number(self.num_slots_per_blk as f64),
        ]
    }
}

/// A row of the attribute catalog
#[derive(Debug, Clone, PartialEq)]
pub struct AttrCatEntry {
    pub rel_name: String,
    pub attr_name: String,
    pub attr_type: AttrType,
    pub primary_flag: bool,
    pub root_block: Option<BlockNum>,
    pub offset: usize,
}

impl AttrCatEntry {
    /// Row for a new, unindexed attribute.
    pub fn new(rel_name: &str, attr_name: &str, attr_type: AttrType, offset: usize) -> Self {
        Self {
            rel_name: rel_name.to_string(),
            attr_name: attr_name.to_string(),
            attr_type,
            primary_flag: false,
            root_block: None,
            offset,
        }
    }

    pub fn from_record(record: &[Attribute]) -> Result<Self> {
        let type_code = number_field(record, ATTRCAT_ATTR_TYPE_INDEX, "attribute type")?;
        Ok(Self {
            rel_name: text_field(record, ATTRCAT_REL_NAME_INDEX, "relation name")?,
            attr_name: text_field(record, ATTRCAT_ATTR_NAME_INDEX, "attribute name")?,
            attr_type: AttrType::from_code(type_code).ok_or_else(|| corrupted("attribute type"))?,
            primary_flag: number_field(record, ATTRCAT_PRIMARY_FLAG_INDEX, "primary flag")? > 0.0,
            root_block: block_field(record, ATTRCAT_ROOT_BLOCK_INDEX, "root block")?,
            offset: count_field(record, ATTRCAT_OFFSET_INDEX, "offset")?,
        })
    }

    pub fn to_record(&self) -> Vec<Attribute> {
        vec![
            Attribute::Text(self.rel_name.clone()),
            Attribute::Text(self.attr_name.clone()),
            Attribute::Number(self.attr_type.code()),
            Attribute::Number(if self.primary_flag { 1.0 } else { -1.0 }),
            block_value(self.root_block),
            Attribute::Number(self.offset as f64),
        ]
    }
}
