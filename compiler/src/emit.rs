use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    bundle::{Direction, TemplateKey, TemplateSet, ARRAY_INDEX, DOC, OBJECTS, RECORD},
    error::BufObjectsError,
    template::Template,
    types::{CompiledDocument, ElementType, Field, FieldShape, FieldType, Record, SourceSpan},
};

/// What field templates see.
#[derive(Debug, Serialize)]
struct FieldView<'a> {
    name:          &'a str,
    /// `name`, escaped when the bundle reserves it.
    ident:         String,
    camel_name:    String,
    /// Element type, record names carrying the configured suffix.
    #[serde(rename = "type")]
    ty:            String,
    raw_type:      &'a str,
    type_token:    &'a str,
    resolved_type: String,
    shape:         FieldShape,
    array_size:    Option<u32>,
    base_size:     Option<usize>,
    is_object:     bool,
    is_array:      bool,
    is_slice:      bool,
    element:       String,
    write:         String,
    read:          String,
}

#[derive(Debug, Serialize)]
struct RecordView<'a> {
    id:               u16,
    name:             &'a str,
    raw_name:         &'a str,
    is_variable_size: bool,
    fixed_size:       Option<usize>,
    fields:           Vec<FieldView<'a>>,
    code:             String,
}

#[derive(Debug, Serialize)]
struct SourceView<'a> {
    origin:  &'a str,
    records: Vec<RecordView<'a>>,
}

#[derive(Debug, Serialize)]
struct DocView<'a> {
    package_name:    &'a str,
    interface_name:  &'a str,
    imports:         Vec<String>,
    max_object_size: usize,
    body:            &'a str,
    records:         Vec<RecordView<'a>>,
}

/// Renders a resolved document through one language's template set.
pub struct Emitter<'a> {
    templates: &'a TemplateSet,
    doc:       &'a CompiledDocument,
}

impl<'a> Emitter<'a> {
    pub fn new(templates: &'a TemplateSet, doc: &'a CompiledDocument) -> Self {
        Emitter { templates, doc }
    }

    /// Encode or decode code for one field.
    ///
    /// Array, slice and indexed object templates get the code for a single
    /// element as `element`; it is produced by emitting a synthetic field
    /// named after the `array_index` expression.
    pub fn emit_field(&self, field: &Field, direction: Direction) -> Result<String, BufObjectsError> {
        let key = TemplateKey::for_shape(field.shape(), &field.ty.element);
        let template = self.templates.field_template(key, direction)?;

        let mut view = self.field_view(field);
        if key.is_indexed() {
            view.element = self.emit_element(field, direction)?;
        }
        let code = self.render(template, &view)?;
        Ok(code.trim_end_matches('\n').to_string())
    }

    fn emit_element(&self, field: &Field, direction: Direction) -> Result<String, BufObjectsError> {
        let index = self.render(self.templates.get(ARRAY_INDEX)?, &self.field_view(field))?;
        let shape = match field.ty.element {
            ElementType::Scalar(_) => FieldShape::Scalar,
            ElementType::Object(_) => FieldShape::ObjectReference,
        };
        let element = Field {
            name:       index.trim().to_string(),
            type_token: field.element_type().to_string(),
            ty:         FieldType {
                shape,
                element:      field.ty.element.clone(),
                array_length: None,
            },
        };
        self.emit_field(&element, direction)
    }

    /// Code for one record, rendered by the `record` template.
    pub fn emit_record(&self, record: &Record) -> Result<String, BufObjectsError> {
        Ok(self.record_view(record)?.code)
    }

    /// Code for the records of one source, rendered by the `objects` template.
    pub fn emit_source(&self, span: &SourceSpan) -> Result<String, BufObjectsError> {
        let records = self.doc.records.get(span.records.clone()).ok_or_else(|| {
            BufObjectsError::Config(format!("source {} points past the record list", span.origin))
        })?;
        let view = SourceView {
            origin:  &span.origin,
            records: records
                .iter()
                .map(|r| self.record_view(r))
                .collect::<Result<_, _>>()?,
        };
        self.render(self.templates.get(OBJECTS)?, &view)
    }

    /// Every source's fragment, in ingestion order.
    pub fn emit_body(&self) -> Result<String, BufObjectsError> {
        let mut body = String::new();
        for span in &self.doc.sources {
            debug!(origin = %span.origin, records = span.records.len(), "emitting source");
            body.push_str(&self.emit_source(span)?);
        }
        Ok(body)
    }

    /// The complete output unit, wrapping `generated_body` in the `doc` template.
    pub fn emit_document(&self) -> Result<String, BufObjectsError> {
        let config = &self.doc.config;
        let view = DocView {
            package_name:    &config.package_name,
            interface_name:  &config.interface_name,
            imports:         self.imports(),
            max_object_size: config.max_object_size,
            body:            &self.doc.generated_body,
            records:         self
                .doc
                .records
                .iter()
                .map(|r| self.record_view(r))
                .collect::<Result<_, _>>()?,
        };
        self.render(self.templates.get(DOC)?, &view)
    }

    /// Bundle base imports, configured imports, then those the bundle asks
    /// for per element type in use. First occurrence wins.
    pub fn imports(&self) -> Vec<String> {
        let per_element = self
            .doc
            .records
            .iter()
            .flat_map(|r| r.fields.iter())
            .flat_map(|f| self.templates.imports_for(f.element_type()));

        let mut imports: Vec<String> = Vec::new();
        for import in self
            .templates
            .base_imports()
            .iter()
            .chain(&self.doc.config.imports)
            .chain(per_element)
        {
            if !imports.contains(import) {
                imports.push(import.clone());
            }
        }
        imports
    }

    fn record_view<'r>(&self, record: &'r Record) -> Result<RecordView<'r>, BufObjectsError> {
        let mut fields = Vec::with_capacity(record.fields.len());
        for field in &record.fields {
            let mut view = self.field_view(field);
            view.write = self.emit_field(field, Direction::Write)?;
            view.read = self.emit_field(field, Direction::Read)?;
            fields.push(view);
        }

        let mut view = RecordView {
            id: record.id,
            name: &record.name,
            raw_name: &record.raw_name,
            is_variable_size: record.is_variable_size,
            fixed_size: record.fixed_size,
            fields,
            code: String::new(),
        };
        let code = self.render(self.templates.get(RECORD)?, &view)?;
        view.code = code.trim_end_matches('\n').to_string();
        Ok(view)
    }

    fn field_view<'f>(&self, field: &'f Field) -> FieldView<'f> {
        let ty = self.resolved_element(&field.ty.element);
        let resolved_type = match (field.shape(), field.array_length()) {
            (shape, Some(n)) if shape.is_fixed_array() => format!("[{}]{}", n, ty),
            (shape, _) if shape.is_dynamic_sequence() => format!("[]{}", ty),
            _ => ty.clone(),
        };
        FieldView {
            name: &field.name,
            ident: self.templates.identifier(&field.name),
            camel_name: field.lower_camel_name(),
            ty,
            raw_type: field.element_type(),
            type_token: &field.type_token,
            resolved_type,
            shape: field.shape(),
            array_size: field.array_length(),
            base_size: field.base_size(),
            is_object: field.shape().is_object(),
            is_array: field.shape().is_fixed_array(),
            is_slice: field.shape().is_dynamic_sequence(),
            element: String::new(),
            write: String::new(),
            read: String::new(),
        }
    }

    fn resolved_element(&self, element: &ElementType) -> String {
        match element {
            ElementType::Scalar(t) => t.keyword().to_string(),
            ElementType::Object(raw) => match self.doc.record_by_raw_name(raw) {
                Some(record) => record.name.clone(),
                None => format!("{}{}", raw, self.doc.config.name_suffix),
            },
        }
    }

    /// Renders `view` with the document settings visible underneath it.
    fn render<T: Serialize>(&self, template: &Template, view: &T) -> Result<String, BufObjectsError> {
        let mut context = serde_json::to_value(view)?;
        if let (Value::Object(map), Value::Object(config)) = (&mut context, serde_json::to_value(&self.doc.config)?) {
            for (key, value) in config {
                map.entry(key).or_insert(value);
            }
        }
        template.render(&context)
    }
}
