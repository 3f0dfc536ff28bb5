//!
//! Attribute group schemas and values
//!
use std::{
    collections::{BTreeMap, BTreeSet},
    io::Read,
    sync::Arc,
};

use bytes::BytesMut;
use log::{debug, trace};

use crate::{
    error::IppCodecError,
    field::{put_header, put_value, skip_value, FieldCodec, FieldDef},
    model::{DelimiterTag, ValueTag},
    parser::ParserState,
    util::{decode_text, to_field_name, to_wire_name},
    value::IppValue,
};

/// Charset accepted in `attributes-charset`
pub const SUPPORTED_CHARSET: &str = "utf-8";

const CHARSET_FIELD: &str = "attributes_charset";

static SELECT_ALL: RequestedAttributes = RequestedAttributes::All;

/// Attribute selection requested by a client
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedAttributes {
    All,
    /// Wire names and group keywords such as `printer-description`
    Named(BTreeSet<String>),
}

impl RequestedAttributes {
    /// Build from keywords, `all` anywhere in the list selects everything
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names = BTreeSet::new();
        for keyword in keywords {
            let keyword = keyword.as_ref();
            if keyword == "all" {
                return RequestedAttributes::All;
            }
            names.insert(keyword.to_owned());
        }
        RequestedAttributes::Named(names)
    }

    /// Build from a `requested-attributes` value
    pub fn from_value(value: &IppValue) -> Self {
        RequestedAttributes::from_keywords(value.iter().filter_map(|v| v.as_str()))
    }

    fn selects_group(&self, filter: Option<&str>) -> bool {
        match self {
            RequestedAttributes::All => true,
            RequestedAttributes::Named(names) => filter.is_some_and(|f| names.contains(f)),
        }
    }

    fn contains(&self, wire_name: &str) -> bool {
        match self {
            RequestedAttributes::All => true,
            RequestedAttributes::Named(names) => names.contains(wire_name),
        }
    }
}

/// Declarative description of an attribute group or collection
#[derive(Debug)]
pub struct GroupSchema {
    tag: Option<DelimiterTag>,
    filter: Option<&'static str>,
    permanent: Vec<&'static str>,
    default_filter: Option<RequestedAttributes>,
    fields: Vec<FieldDef>,
    parts: Vec<Arc<GroupSchema>>,
}

/// Builder for [`GroupSchema`]
pub struct GroupSchemaBuilder {
    schema: GroupSchema,
}

impl GroupSchemaBuilder {
    /// Keyword selecting the whole group in `requested-attributes`
    pub fn filter(mut self, keyword: &'static str) -> Self {
        self.schema.filter = Some(keyword);
        self
    }

    /// Fields written whatever the client requested
    pub fn permanent(mut self, names: &[&'static str]) -> Self {
        self.schema.permanent.extend_from_slice(names);
        self
    }

    /// Selection applied when the client sent no `requested-attributes`.
    /// For merged groups `None` delegates to the defaults of each part.
    pub fn default_filter(mut self, filter: Option<RequestedAttributes>) -> Self {
        self.schema.default_filter = filter;
        self
    }

    /// Inherit fields and permanent members of another group
    pub fn extend(mut self, base: &GroupSchema) -> Self {
        for field in &base.fields {
            self = self.field(field.clone());
        }
        for &name in &base.permanent {
            if !self.schema.permanent.contains(&name) {
                self.schema.permanent.push(name);
            }
        }
        self
    }

    /// Declare a field, replacing an inherited field of the same name in place
    pub fn field(mut self, field: FieldDef) -> Self {
        match self.schema.fields.iter_mut().find(|f| f.name() == field.name()) {
            Some(existing) => *existing = field,
            None => self.schema.fields.push(field),
        }
        self
    }

    /// Add a part to a merged group
    pub fn part(mut self, part: &Arc<GroupSchema>) -> Self {
        for field in &part.fields {
            self = self.field(field.clone());
        }
        self.schema.parts.push(part.clone());
        self
    }

    pub fn build(self) -> Arc<GroupSchema> {
        Arc::new(self.schema)
    }
}

impl GroupSchema {
    fn builder_with_tag(tag: Option<DelimiterTag>) -> GroupSchemaBuilder {
        GroupSchemaBuilder {
            schema: GroupSchema {
                tag,
                filter: None,
                permanent: Vec::new(),
                default_filter: Some(RequestedAttributes::All),
                fields: Vec::new(),
                parts: Vec::new(),
            },
        }
    }

    /// Schema of a group bound to a section tag
    pub fn builder(tag: DelimiterTag) -> GroupSchemaBuilder {
        Self::builder_with_tag(Some(tag))
    }

    /// Schema of a collection value
    pub fn collection() -> GroupSchemaBuilder {
        Self::builder_with_tag(None)
    }

    pub fn tag(&self) -> Option<DelimiterTag> {
        self.tag
    }

    pub fn filter_keyword(&self) -> Option<&'static str> {
        self.filter
    }

    pub fn is_merged(&self) -> bool {
        !self.parts.is_empty()
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Copy without required flags, defaults or order, for decoding replies filtered by `requested-attributes`
    pub fn relaxed(&self) -> Arc<GroupSchema> {
        let mut builder = Self::builder_with_tag(self.tag);
        for field in &self.fields {
            builder = builder.field(FieldDef::new(field.name(), field.kind().clone()));
        }
        builder.build()
    }

    /// Fields selected by the request, in write order
    pub fn selected_fields(&self, requested: Option<&RequestedAttributes>) -> Vec<&FieldDef> {
        let mut selected = self.filter_fields(requested);
        selected.sort_by_key(|f| f.order_key().unwrap_or(i32::MAX));
        selected
    }

    fn filter_fields(&self, requested: Option<&RequestedAttributes>) -> Vec<&FieldDef> {
        let requested = requested.or(self.default_filter.as_ref());

        if self.is_merged() {
            let mut names = BTreeSet::new();
            for part in &self.parts {
                names.extend(part.filter_fields(requested).into_iter().map(|f| f.name()));
            }
            return self.fields.iter().filter(|f| names.contains(f.name())).collect();
        }

        let requested = requested.unwrap_or(&SELECT_ALL);
        if requested.selects_group(self.filter) {
            return self.fields.iter().collect();
        }

        self.fields
            .iter()
            .filter(|f| requested.contains(&to_wire_name(f.name())) || self.permanent.contains(&f.name()))
            .collect()
    }

    // required fields present, ordered fields in order, charset accepted
    fn validate(&self, read: &[(&'static str, IppValue)]) -> Result<(), IppCodecError> {
        for field in self.fields.iter().filter(|f| f.is_required()) {
            if !read.iter().any(|(name, _)| *name == field.name()) {
                return Err(IppCodecError::MissingField(to_wire_name(field.name())));
            }
        }

        let mut last_ordered: Option<(i32, &str)> = None;
        for &(name, _) in read {
            let Some(order) = self.field(name).and_then(|f| f.order_key()) else {
                continue;
            };
            if let Some((last_order, last_name)) = last_ordered {
                if last_order > order {
                    return Err(IppCodecError::FieldOrder {
                        before: to_wire_name(last_name),
                        after: to_wire_name(name),
                    });
                }
            }
            last_ordered = Some((order, name));
        }

        if let Some((_, charset)) = read.iter().find(|(name, _)| *name == CHARSET_FIELD) {
            let charset = charset.as_str().unwrap_or_default();
            if !charset.eq_ignore_ascii_case(SUPPORTED_CHARSET) {
                return Err(IppCodecError::InvalidCharset(charset.to_owned()));
            }
        }

        Ok(())
    }
}

/// Values of one attribute group or collection, bound to its schema
#[derive(Clone, Debug)]
pub struct AttributeGroup {
    schema: Arc<GroupSchema>,
    values: BTreeMap<&'static str, IppValue>,
}

impl PartialEq for AttributeGroup {
    fn eq(&self, other: &Self) -> bool {
        self.schema.tag == other.schema.tag && self.values == other.values
    }
}

impl AttributeGroup {
    /// Create a group holding the default value of every field that declares one
    pub fn new(schema: &Arc<GroupSchema>) -> Self {
        let values = schema
            .fields
            .iter()
            .filter_map(|f| f.default_value().map(|v| (f.name(), v.clone())))
            .collect();
        AttributeGroup {
            schema: schema.clone(),
            values,
        }
    }

    /// Create a group without any values
    pub fn empty(schema: &Arc<GroupSchema>) -> Self {
        AttributeGroup {
            schema: schema.clone(),
            values: BTreeMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<GroupSchema> {
        &self.schema
    }

    pub fn tag(&self) -> Option<DelimiterTag> {
        self.schema.tag
    }

    pub fn get(&self, name: &str) -> Option<&IppValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Set the value of a declared field
    pub fn set(&mut self, name: &str, value: IppValue) -> Result<(), IppCodecError> {
        let field = self
            .schema
            .field(name)
            .ok_or_else(|| IppCodecError::UnknownField(name.to_owned()))?;
        self.values.insert(field.name(), value);
        Ok(())
    }

    /// Builder-style [`AttributeGroup::set`]
    pub fn with(mut self, name: &str, value: IppValue) -> Result<Self, IppCodecError> {
        self.set(name, value)?;
        Ok(self)
    }

    pub fn remove(&mut self, name: &str) -> Option<IppValue> {
        self.values.remove(name)
    }

    /// Present values in name order
    pub fn values(&self) -> impl Iterator<Item = (&'static str, &IppValue)> + '_ {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Write the fields selected by `requested`, without the section tag
    pub fn write_to(
        &self,
        buffer: &mut BytesMut,
        requested: Option<&RequestedAttributes>,
    ) -> Result<(), IppCodecError> {
        for field in self.schema.selected_fields(requested) {
            if let Some(value) = self.values.get(field.name()) {
                field.kind().write(buffer, field.name(), value)?;
            }
        }
        Ok(())
    }

    /// Read a group whose section tag is the cursor's current tag.
    /// Stops at the next section tag, skipping attributes the schema does not declare.
    pub fn read_from<R: Read>(schema: &Arc<GroupSchema>, state: &mut ParserState<R>) -> Result<Self, IppCodecError> {
        state.read_field_header()?;

        let mut read = Vec::new();
        while !state.is_section_tag() {
            if state.current_name().is_empty() {
                debug!("Dropping stray value with tag {:#04x}", state.current_tag());
                skip_value(state)?;
                continue;
            }
            match schema.field(state.current_name()) {
                Some(field) => {
                    let value = field.kind().read(state)?;
                    insert_read(&mut read, field.name(), value);
                }
                None => {
                    trace!("Ignoring unknown attribute '{}'", state.current_name());
                    skip_value(state)?;
                }
            }
        }

        Self::from_read(schema, read)
    }

    /// Read collection members up to, not including, the endCollection tag
    pub(crate) fn read_members<R: Read>(
        schema: &Arc<GroupSchema>,
        state: &mut ParserState<R>,
    ) -> Result<Self, IppCodecError> {
        let mut read = Vec::new();
        loop {
            let tag = state.current_tag();
            if tag == ValueTag::EndCollection as u8 {
                break;
            }
            if tag != ValueTag::MemberAttrName as u8 {
                return Err(IppCodecError::InvalidCollection(tag));
            }

            let member = to_field_name(&decode_text(&state.read_value()?));
            state.read_field_header()?;

            match schema.field(&member) {
                Some(field) => {
                    let value = field.kind().read(state)?;
                    insert_read(&mut read, field.name(), value);
                }
                None => {
                    trace!("Ignoring unknown collection member '{member}'");
                    skip_value(state)?;
                }
            }
        }

        Self::from_read(schema, read)
    }

    /// Write collection members as memberAttrName/value pairs
    pub(crate) fn write_members(&self, buffer: &mut BytesMut) -> Result<(), IppCodecError> {
        for field in self.schema.selected_fields(Some(&SELECT_ALL)) {
            if let Some(value) = self.values.get(field.name()) {
                put_header(buffer, ValueTag::MemberAttrName as u8, "")?;
                put_value(buffer, to_wire_name(field.name()).as_bytes())?;
                field.kind().write(buffer, "", value)?;
            }
        }
        Ok(())
    }

    fn from_read(schema: &Arc<GroupSchema>, read: Vec<(&'static str, IppValue)>) -> Result<Self, IppCodecError> {
        schema.validate(&read)?;

        let mut group = AttributeGroup::new(schema);
        group.values.extend(read);
        Ok(group)
    }
}

// a repeated attribute replaces the earlier value in place
fn insert_read(read: &mut Vec<(&'static str, IppValue)>, name: &'static str, value: IppValue) {
    match read.iter_mut().find(|(n, _)| *n == name) {
        Some(entry) => entry.1 = value,
        None => read.push((name, value)),
    }
}
