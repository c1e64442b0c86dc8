//! Annotated content → well-nested markup.
//!
//! Each unit's annotation set is diffed against the previous unit's. The
//! tags currently open in the output are tracked on a nesting stack;
//! when an annotation has to close while others opened after it are still
//! open, those are closed first and reopened right after, so the output is
//! always a valid tag tree even for overlapping ranges.

use std::collections::HashSet;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::annotation::{Annotation, AnnotationId, AnnotationRef, ContentUnit};
use crate::config::Config;
use crate::error::{ConfigError, RenderError};
use crate::escape::Escaper;
use crate::registry::AnnotationRegistry;

/// Render `units` to a markup string.
///
/// Nothing is returned on error, not even a partial string.
pub fn render(
    units: &[ContentUnit],
    registry: &AnnotationRegistry,
    escaper: &Escaper,
) -> Result<String, RenderError> {
    let mut out = String::with_capacity(units.len());
    render_into(units, registry, escaper, &mut out)
        .inspect_err(|e| warn!(error = %e, "render failed"))?;
    Ok(out)
}

/// Render `units` into `out`.
///
/// On error `out` may already hold a prefix of the output.
pub fn render_into<W: fmt::Write>(
    units: &[ContentUnit],
    registry: &AnnotationRegistry,
    escaper: &Escaper,
    out: &mut W,
) -> Result<(), RenderError> {
    let mut pass = Pass::new(registry, escaper, out);
    let mut previous: &[AnnotationRef] = &[];

    for (index, unit) in units.iter().enumerate() {
        check_duplicates(index, unit)?;
        let current = unit.annotations.as_slice();

        match (previous.is_empty(), current.is_empty()) {
            (true, true) => {}
            (true, false) => {
                for annotation in current {
                    pass.open(index, annotation)?;
                }
            }
            (false, true) => pass.close_all(index, previous.iter())?,
            (false, false) => {
                let closing = previous.iter().filter(|a| !contains(current, a));
                pass.close_all(index, closing)?;
                for annotation in current.iter().filter(|a| !contains(previous, a)) {
                    pass.open(index, annotation)?;
                }
            }
        }

        pass.push_char(unit.ch)?;
        previous = current;
    }

    pass.finish()
}

/// A registry and escaper bundled for repeated rendering.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    registry: AnnotationRegistry,
    escaper: Escaper,
}

impl Renderer {
    pub fn new(registry: AnnotationRegistry, escaper: Escaper) -> Self {
        Self { registry, escaper }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(config.registry(), config.escaper()?))
    }

    pub fn render(&self, units: &[ContentUnit]) -> Result<String, RenderError> {
        render(units, &self.registry, &self.escaper)
    }

    pub fn render_into<W: fmt::Write>(
        &self,
        units: &[ContentUnit],
        out: &mut W,
    ) -> Result<(), RenderError> {
        render_into(units, &self.registry, &self.escaper, out)
    }
}

fn contains(set: &[AnnotationRef], annotation: &Annotation) -> bool {
    set.iter().any(|a| a.id() == annotation.id())
}

fn check_duplicates(index: usize, unit: &ContentUnit) -> Result<(), RenderError> {
    for (i, annotation) in unit.annotations.iter().enumerate() {
        if contains(&unit.annotations[..i], annotation) {
            return Err(RenderError::Duplicate {
                id: annotation.id(),
                kind: annotation.kind().to_string(),
                unit: index,
            });
        }
    }
    Ok(())
}

/// Annotations currently open in the output, outermost first.
#[derive(Debug, Default)]
struct NestingStack<'a> {
    open: Vec<&'a Annotation>,
}

impl<'a> NestingStack<'a> {
    fn push(&mut self, annotation: &'a Annotation) {
        self.open.push(annotation);
    }

    fn pop(&mut self) -> Option<&'a Annotation> {
        self.open.pop()
    }

    fn position(&self, id: AnnotationId) -> Option<usize> {
        self.open.iter().rposition(|a| a.id() == id)
    }

    /// Remove and return everything above `index`, outermost first.
    fn split_above(&mut self, index: usize) -> Vec<&'a Annotation> {
        self.open.split_off(index + 1)
    }
}

/// State of a single render call.
struct Pass<'a, 'w, W> {
    registry: &'a AnnotationRegistry,
    escaper: &'a Escaper,
    out: &'w mut W,
    stack: NestingStack<'a>,
    // Instances that have been closed for good.
    closed: HashSet<AnnotationId>,
}

impl<'a, 'w, W: fmt::Write> Pass<'a, 'w, W> {
    fn new(registry: &'a AnnotationRegistry, escaper: &'a Escaper, out: &'w mut W) -> Self {
        Self {
            registry,
            escaper,
            out,
            stack: NestingStack::default(),
            closed: HashSet::new(),
        }
    }

    fn is_known(&self, annotation: &Annotation) -> bool {
        let known = self.registry.contains(annotation.kind());
        if !known {
            trace!(kind = annotation.kind(), id = %annotation.id(), "no rule for annotation kind");
        }
        known
    }

    fn open(&mut self, unit: usize, annotation: &'a Annotation) -> Result<(), RenderError> {
        if !self.is_known(annotation) {
            return Ok(());
        }
        if self.closed.contains(&annotation.id()) {
            return Err(RenderError::Reopened {
                id: annotation.id(),
                kind: annotation.kind().to_string(),
                unit,
            });
        }
        self.stack.push(annotation);
        self.write_open(annotation)
    }

    /// Close every annotation in `annotations`, in the order given.
    fn close_all<I>(&mut self, unit: usize, annotations: I) -> Result<(), RenderError>
    where
        I: Iterator<Item = &'a AnnotationRef>,
    {
        for annotation in annotations {
            if self.is_known(annotation) {
                self.close(unit, annotation)?;
            }
        }
        Ok(())
    }

    fn close(&mut self, unit: usize, annotation: &'a Annotation) -> Result<(), RenderError> {
        let Some(index) = self.stack.position(annotation.id()) else {
            return Err(RenderError::StackConsistency {
                id: annotation.id(),
                kind: annotation.kind().to_string(),
                unit,
            });
        };

        let buried = self.stack.split_above(index);
        if !buried.is_empty() {
            debug!(
                kind = annotation.kind(),
                id = %annotation.id(),
                unit,
                reopened = buried.len(),
                "closing buried annotation"
            );
        }

        for above in buried.iter().rev() {
            self.write_close(above)?;
        }
        self.write_close(annotation)?;
        self.stack.pop();
        self.closed.insert(annotation.id());

        for above in buried {
            self.stack.push(above);
            self.write_open(above)?;
        }
        Ok(())
    }

    fn push_char(&mut self, ch: char) -> Result<(), RenderError> {
        self.escaper.write_escaped(ch, &mut *self.out)?;
        Ok(())
    }

    fn finish(mut self) -> Result<(), RenderError> {
        while let Some(annotation) = self.stack.pop() {
            self.write_close(annotation)?;
        }
        Ok(())
    }

    fn write_open(&mut self, annotation: &Annotation) -> Result<(), RenderError> {
        if let Some(rule) = self.registry.get(annotation.kind()) {
            self.out.write_str(&rule.open.resolve(annotation.data()))?;
        }
        Ok(())
    }

    fn write_close(&mut self, annotation: &Annotation) -> Result<(), RenderError> {
        if let Some(rule) = self.registry.get(annotation.kind()) {
            self.out.write_str(&rule.close.resolve(annotation.data()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::registry::{Markup, RenderRule};

    fn registry() -> AnnotationRegistry {
        AnnotationRegistry::new()
            .with_rule("a", RenderRule::new("<A>", "</A>"))
            .with_rule("b", RenderRule::new("<B>", "</B>"))
            .with_rule("c", RenderRule::new("<C>", "</C>"))
            .with_rule(
                "link",
                RenderRule::new(Markup::template("<a href=\"{href}\">"), "</a>"),
            )
    }

    fn escaper() -> Escaper {
        Escaper::new()
            .with('<', "&lt;")
            .with('&', "&amp;")
            .with('\n', "¶<br>")
    }

    fn unit(ch: char, annotations: &[&AnnotationRef]) -> ContentUnit {
        ContentUnit::annotated(ch, annotations.iter().map(|a| (*a).clone()).collect())
    }

    fn run(units: &[ContentUnit]) -> String {
        match render(units, &registry(), &escaper()) {
            Ok(out) => out,
            Err(e) => panic!("render failed: {e}"),
        }
    }

    #[test]
    fn empty_input() {
        assert_eq!(run(&[]), "");
    }

    #[test]
    fn plain_input_is_escaped_text() {
        let units = crate::annotation::plain_units("a<b & c\n");
        assert_eq!(run(&units), "a&lt;b &amp; c¶<br>");
    }

    #[test]
    fn simple_run() {
        let a = Annotation::new("a");
        let units = [
            ContentUnit::plain('x'),
            unit('y', &[&a]),
            unit('z', &[&a]),
            ContentUnit::plain('w'),
        ];
        assert_eq!(run(&units), "x<A>yz</A>w");
    }

    #[test]
    fn escapes_inside_annotated_runs() {
        let a = Annotation::new("a");
        let units = [unit('<', &[&a]), ContentUnit::plain('<')];
        assert_eq!(run(&units), "<A>&lt;</A>&lt;");
    }

    #[test]
    fn overlapping_ranges_reopen() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let units = [unit('x', &[&a]), unit('y', &[&a, &b]), unit('z', &[&b])];
        assert_eq!(run(&units), "<A>x<B>y</B></A><B>z</B>");
    }

    #[test]
    fn deeply_buried_close_reopens_in_stack_order() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let c = Annotation::new("c");
        let units = [
            unit('x', &[&a]),
            unit('y', &[&a, &b]),
            unit('z', &[&a, &b, &c]),
            unit('w', &[&b, &c]),
        ];
        assert_eq!(run(&units), "<A>x<B>y<C>z</C></B></A><B><C>w</C></B>");
    }

    #[test]
    fn middle_of_stack_closes() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let c = Annotation::new("c");
        let units = [unit('x', &[&a, &b, &c]), unit('y', &[&a, &c])];
        assert_eq!(run(&units), "<A><B><C>x</C></B><C>y</C></A>");
    }

    #[test]
    fn trailing_annotations_close_innermost_first() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let units = [ContentUnit::plain('x'), unit('y', &[&a, &b])];
        assert_eq!(run(&units), "x<A><B>y</B></A>");
    }

    #[test]
    fn annotated_to_plain_closes_in_unit_order() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let units = [unit('x', &[&a, &b]), ContentUnit::plain('y')];
        // `a` is buried under `b`, so `b` is reopened before it closes
        assert_eq!(run(&units), "<A><B>x</B></A><B></B>y");
    }

    #[test]
    fn innermost_listed_first_closes_directly() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let units = [unit('x', &[&a]), unit('y', &[&b, &a]), ContentUnit::plain('z')];
        assert_eq!(run(&units), "<A>x<B>y</B></A>z");
    }

    #[test]
    fn partial_close_reopens_survivors() {
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let c = Annotation::new("c");
        let units = [unit('x', &[&a, &b, &c]), unit('y', &[&c])];
        assert_eq!(run(&units), "<A><B><C>x</C></B></A><B><C></C></B><C>y</C>");
    }

    #[test]
    fn unknown_kind_adds_no_markup() {
        let unknown = Annotation::new("sparkle");
        let a = Annotation::new("a");
        let units = [
            unit('x', &[&unknown]),
            unit('y', &[&unknown, &a]),
            unit('z', &[&a]),
        ];
        assert_eq!(run(&units), "x<A>yz</A>");
    }

    #[test]
    fn identical_instances_are_not_merged() {
        let first = Annotation::new("a");
        let second = Annotation::new("a");
        let units = [unit('x', &[&first]), unit('y', &[&second])];
        assert_eq!(run(&units), "<A>x</A><A>y</A>");
    }

    #[test]
    fn computed_markup_uses_instance_payload() {
        let home = Annotation::with_data("link", json!({ "href": "/" }));
        let docs = Annotation::with_data("link", json!({ "href": "/docs" }));
        let units = [unit('h', &[&home]), unit('d', &[&docs])];
        assert_eq!(run(&units), "<a href=\"/\">h</a><a href=\"/docs\">d</a>");
    }

    #[test]
    fn reappearing_instance_is_rejected() {
        let a = Annotation::new("a");
        let units = [unit('x', &[&a]), ContentUnit::plain('y'), unit('z', &[&a])];
        let err = render(&units, &registry(), &escaper());
        assert!(matches!(err, Err(RenderError::Reopened { unit: 2, .. })));
    }

    #[test]
    fn duplicate_instance_is_rejected() {
        let a = Annotation::new("a");
        let units = [unit('x', &[&a, &a])];
        let err = render(&units, &registry(), &escaper());
        assert!(matches!(err, Err(RenderError::Duplicate { unit: 0, .. })));
    }

    #[test]
    fn closing_an_unopened_annotation_is_fatal() {
        let registry = registry();
        let escaper = escaper();
        let a = Annotation::new("a");
        let mut out = String::new();
        let mut pass = Pass::new(&registry, &escaper, &mut out);

        let err = pass.close(3, &a);
        match err {
            Err(RenderError::StackConsistency { id, kind, unit }) => {
                assert_eq!(id, a.id());
                assert_eq!(kind, "a");
                assert_eq!(unit, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn stack_is_empty_after_finish() {
        let registry = registry();
        let escaper = escaper();
        let a = Annotation::new("a");
        let b = Annotation::new("b");
        let mut out = String::new();
        let mut pass = Pass::new(&registry, &escaper, &mut out);

        assert!(pass.open(0, &a).is_ok());
        assert!(pass.open(0, &b).is_ok());
        assert_eq!(pass.stack.open.len(), 2);
        assert!(pass.close(1, &a).is_ok());
        assert_eq!(pass.stack.open.len(), 1);
        assert!(pass.finish().is_ok());
        assert_eq!(out, "<A><B></B></A><B></B>");
    }

    #[test]
    fn renderer_matches_free_function() {
        let a = Annotation::new("a");
        let units = [unit('x', &[&a]), ContentUnit::plain('<')];
        let renderer = Renderer::new(registry(), escaper());

        let mut streamed = String::new();
        assert!(renderer.render_into(&units, &mut streamed).is_ok());
        assert_eq!(renderer.render(&units).ok(), Some(streamed));
    }
}
