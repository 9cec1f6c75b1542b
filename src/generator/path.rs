//! Path navigation, indexers and choice-type resolution

use super::SqlGenerator;
use super::fragment::{Anchor, ChoiceSite, Fragment, Shape, ValueKind};
use crate::ast::{ExpressionNode, Visitor, is_type_name};
use crate::config::ChoiceType;
use crate::dialect::JsonPath;
use crate::error::TranslationResult;

impl SqlGenerator<'_> {
    /// Whether `name` is the resource type rows are filtered by
    pub(crate) fn is_resource_type(&self, name: &str) -> bool {
        is_type_name(name)
            && self
                .resource_type
                .as_deref()
                .is_none_or(|resource_type| resource_type == name)
    }

    pub(crate) fn path(&mut self, segments: &[ExpressionNode]) -> TranslationResult<Fragment> {
        let mut focus: Option<Fragment> = None;
        for (i, segment) in segments.iter().enumerate() {
            if i == 0
                && segment
                    .as_identifier()
                    .is_some_and(|name| self.is_resource_type(name))
            {
                continue;
            }
            let next = match focus.take() {
                Some(current) => self.with_segment(current, |g| g.visit_expression(segment))?,
                None => self.visit_expression(segment)?,
            };
            focus = Some(next);
        }
        Ok(focus.unwrap_or_else(|| self.scopes.focus().clone()))
    }

    /// Extract `field` from `focus`
    ///
    /// Plain objects are navigated with a direct extraction. Once an array
    /// field has been crossed the dialect's nested extraction takes over,
    /// which maps the field over every element and collapses single-element
    /// arrays to their only value.
    pub(crate) fn navigate(&mut self, focus: &Fragment, field: &str) -> TranslationResult<Fragment> {
        if focus.resource_root {
            if let Some(choice) = self.choice_for(field) {
                return self.resolve_choice(focus, choice);
            }
        }

        let fields = &self.config().fields;
        let source_path = focus
            .source_path
            .as_ref()
            .map(|p| p.child(field))
            .unwrap_or_else(|| JsonPath::root().child(field));

        let mut fragment = match (&focus.anchor, focus.is_collection()) {
            (Some(anchor), false) => {
                let path = anchor.path.child(field);
                let sql = self.dialect().extract_object(&anchor.base, &path)?;
                let shape = if fields.is_array_field(field) {
                    Shape::Collection
                } else {
                    Shape::Scalar
                };
                let mut fragment = Fragment::derived(sql, shape, ValueKind::Json, &[focus]);
                fragment.anchor = Some(Anchor {
                    base: anchor.base.clone(),
                    path,
                });
                fragment
            }
            (Some(anchor), true) => {
                let resolved = anchor.path.child(field);
                let sql = self.dialect().extract_nested_array_path(
                    &anchor.base,
                    &anchor.path,
                    field,
                    &resolved,
                )?;
                self.nested(sql, focus)
            }
            (None, true) => {
                let sql = self.dialect().extract_nested_array_path(
                    &focus.sql,
                    &JsonPath::root(),
                    field,
                    &JsonPath::root().child(field),
                )?;
                self.nested(sql, focus)
            }
            (None, false) => {
                let path = JsonPath::root().child(field);
                let sql = self.dialect().extract_object(&focus.sql, &path)?;
                let shape = if fields.is_array_field(field) {
                    Shape::Collection
                } else {
                    Shape::Scalar
                };
                let mut fragment = Fragment::derived(sql, shape, ValueKind::Json, &[focus]);
                fragment.anchor = Some(Anchor {
                    base: focus.sql.clone(),
                    path,
                });
                fragment
            }
        };
        fragment.source_path = Some(source_path);
        fragment.field = Some(field.to_string());

        if fragment.array_nesting > focus.array_nesting {
            let references = fragment
                .dotted_path()
                .map(|dotted| self.references.count(&dotted))
                .unwrap_or(0);
            fragment = self.ctes.process(fragment, self.clause, references);
        }
        log::trace!("navigated to {field}: {}", fragment.sql);
        Ok(fragment)
    }

    fn nested(&self, sql: String, focus: &Fragment) -> Fragment {
        let mut fragment = Fragment::derived(sql, Shape::Collection, ValueKind::Json, &[focus]);
        fragment.array_nesting = focus.array_nesting + 1;
        fragment
    }

    /// Choice element declared for the current resource type
    ///
    /// Without a resource type the element name alone decides, provided
    /// exactly one declaration uses it.
    fn choice_for(&self, element: &str) -> Option<ChoiceType> {
        let choices = &self.config().choice_types;
        match self.resource_type.as_deref() {
            Some(resource_type) => self.config().choice_type(resource_type, element).cloned(),
            None => {
                let mut matching = choices.iter().filter(|c| c.element == element);
                match (matching.next(), matching.next()) {
                    (Some(choice), None) => Some(choice.clone()),
                    _ => None,
                }
            }
        }
    }

    /// `COALESCE` over the concrete variants; the first non-null wins
    fn resolve_choice(&self, focus: &Fragment, choice: ChoiceType) -> TranslationResult<Fragment> {
        let base = focus.sql.clone();
        let variants = choice
            .variants
            .iter()
            .map(|variant| {
                self.dialect()
                    .extract_object(&base, &JsonPath::root().child(variant))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let mut fragment = Fragment::derived(
            format!("COALESCE({})", variants.join(", ")),
            Shape::Scalar,
            ValueKind::Json,
            &[focus],
        );
        fragment.source_path = Some(JsonPath::root().child(&choice.element));
        fragment.field = Some(choice.element.clone());
        fragment.choice = Some(Box::new(ChoiceSite { base, choice }));
        Ok(fragment)
    }

    /// Concrete variant of a choice element, e.g. `deceased.ofType(boolean)`
    pub(crate) fn choice_variant(
        &mut self,
        site: &ChoiceSite,
        type_name: &str,
    ) -> TranslationResult<Fragment> {
        match site.choice.variant_for_type(type_name) {
            Some(variant) => {
                let variant = variant.to_string();
                // the variant is an ordinary field of the document
                let document = Fragment {
                    resource_root: false,
                    ..Fragment::resource_root(site.base.clone())
                };
                self.navigate(&document, &variant)
            }
            None => Ok(Fragment::empty()),
        }
    }

    pub(crate) fn indexer(
        &mut self,
        expression: &ExpressionNode,
        index: &ExpressionNode,
    ) -> TranslationResult<Fragment> {
        let target = self.visit_expression(expression)?;
        let index = self.argument(index)?;
        let position = self.numeric(&index)?;
        let sql = self
            .dialect()
            .extract_array_element(&target.sql, &position)?;
        let mut fragment =
            Fragment::derived(sql, Shape::Scalar, ValueKind::Json, &[&target, &index]);
        fragment.source_path = target.source_path.clone();
        fragment.field = target.field.clone();
        Ok(fragment)
    }
}
