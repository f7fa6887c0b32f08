//! Content model matching
//!
//! Matches an element's children against a model group, assigning each child
//! to the particle that claims it. Sequences consume children in declared
//! order, choices pick one alternative per occurrence, all-groups accept any
//! order, wildcards claim whatever their namespace constraint admits.
//! Occurrence violations become [`ChildrenValidationError`]s carrying the
//! expected particle and the observed count.
//!
//! The matcher is greedy and deterministic: it never backtracks, which keeps
//! it single-pass over the children.

use std::sync::Arc;

use crate::components::{ModelType, Occurs, Particle, XsdAnyElement, XsdElement, XsdGroup};
use crate::documents::Element;
use crate::error::ChildrenValidationError;
use crate::names::QName;
use crate::registry::SchemaRegistry;

/// What a child was matched to
#[derive(Debug, Clone)]
pub enum Matched<'a> {
    /// A local element declaration from the content model
    Decl(&'a XsdElement),
    /// A global element declaration (via ref)
    Global(&'a Arc<XsdElement>),
    /// An element wildcard
    Wildcard(&'a XsdAnyElement),
}

/// The result of matching children against a content model
#[derive(Debug, Default)]
pub struct ContentMatch<'a> {
    /// Child index to matched declaration, one entry per claimed child
    pub assignments: Vec<(usize, Matched<'a>)>,
    /// Occurrence violations in document order
    pub errors: Vec<ChildrenValidationError>,
}

impl<'a> ContentMatch<'a> {
    /// The declaration claimed by a child index, if any
    pub fn matched(&self, index: usize) -> Option<&Matched<'a>> {
        self.assignments
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, matched)| matched)
    }
}

/// Check whether a declared element name matches an instance name
///
/// Unqualified local declarations also match instance elements living in the
/// document's default namespace, so both element-form conventions work.
pub fn names_match(declared: &QName, instance: &QName) -> bool {
    if declared == instance {
        return true;
    }
    declared.namespace.is_none() && declared.local == instance.local
}

/// Match children against a model group
pub fn match_content<'a>(
    group: &'a XsdGroup,
    children: &[Element],
    registry: &'a SchemaRegistry,
) -> ContentMatch<'a> {
    let mut result = ContentMatch::default();
    let pos = consume_group(
        group,
        group.occurs,
        children,
        0,
        registry,
        &mut result,
    );
    for (index, child) in children.iter().enumerate().skip(pos) {
        result
            .errors
            .push(ChildrenValidationError::unexpected(child.name.to_string(), index));
    }
    result
}

fn consume_group<'a>(
    group: &'a XsdGroup,
    occurs: Occurs,
    children: &[Element],
    start: usize,
    registry: &'a SchemaRegistry,
    out: &mut ContentMatch<'a>,
) -> usize {
    let mut pos = start;
    let mut count: u32 = 0;

    loop {
        if let Some(max) = occurs.max {
            if count >= max {
                break;
            }
        }

        // Optional repeats only run when the next child can start one
        if count >= occurs.min {
            match children.get(pos) {
                Some(child) if group_admits(group, child, registry) => {}
                _ => break,
            }
        }

        let before = pos;
        pos = match group.model {
            ModelType::Sequence => consume_sequence_pass(group, children, pos, registry, out),
            ModelType::Choice => consume_choice_pass(group, children, pos, registry, out),
            ModelType::All => consume_all_pass(group, children, pos, registry, out),
        };
        count += 1;

        if pos == before && count >= occurs.min {
            break;
        }
        if pos == before && group.is_emptiable() {
            // An emptiable body makes no progress; repeating it cannot either
            break;
        }
    }

    pos
}

fn consume_sequence_pass<'a>(
    group: &'a XsdGroup,
    children: &[Element],
    start: usize,
    registry: &'a SchemaRegistry,
    out: &mut ContentMatch<'a>,
) -> usize {
    let mut pos = start;
    for particle in &group.particles {
        pos = consume_particle(particle, children, pos, registry, out);
    }
    pos
}

fn consume_choice_pass<'a>(
    group: &'a XsdGroup,
    children: &[Element],
    start: usize,
    registry: &'a SchemaRegistry,
    out: &mut ContentMatch<'a>,
) -> usize {
    let chosen = children.get(start).and_then(|child| {
        group
            .particles
            .iter()
            .find(|p| particle_admits(p, child, registry))
    });

    match chosen {
        Some(particle) => consume_particle(particle, children, start, registry, out),
        None => {
            if !group.is_emptiable() {
                let observed = usize::from(children.get(start).is_some());
                out.errors.push(
                    ChildrenValidationError::new(
                        format!("xs:choice of {} alternatives", group.particles.len()),
                        group.occurs.min,
                        group.occurs.max,
                        observed,
                    )
                    .at_index(start),
                );
            }
            start
        }
    }
}

fn consume_all_pass<'a>(
    group: &'a XsdGroup,
    children: &[Element],
    start: usize,
    registry: &'a SchemaRegistry,
    out: &mut ContentMatch<'a>,
) -> usize {
    let mut counts = vec![0usize; group.particles.len()];
    let mut pos = start;

    'children: while let Some(child) = children.get(pos) {
        for (index, particle) in group.particles.iter().enumerate() {
            if particle_admits(particle, child, registry)
                && !particle.occurs().is_exceeded(counts[index] + 1)
            {
                if let Some(matched) = particle_declaration(particle, registry) {
                    out.assignments.push((pos, matched));
                }
                counts[index] += 1;
                pos += 1;
                continue 'children;
            }
        }
        break;
    }

    for (index, particle) in group.particles.iter().enumerate() {
        if particle.occurs().is_missing(counts[index]) {
            out.errors.push(
                ChildrenValidationError::new(
                    particle.display_name(),
                    particle.occurs().min,
                    particle.occurs().max,
                    counts[index],
                )
                .at_index(pos),
            );
        }
    }

    pos
}

fn consume_particle<'a>(
    particle: &'a Particle,
    children: &[Element],
    start: usize,
    registry: &'a SchemaRegistry,
    out: &mut ContentMatch<'a>,
) -> usize {
    match particle {
        Particle::Element { decl, occurs } => consume_matching(
            children,
            start,
            *occurs,
            &particle.display_name(),
            |child| names_match(decl.qname(), &child.name),
            || Some(Matched::Decl(decl)),
            out,
        ),
        Particle::ElementRef { name, occurs } => {
            let declaration = registry.lookup_element(name);
            consume_matching(
                children,
                start,
                *occurs,
                &particle.display_name(),
                |child| names_match(name, &child.name),
                || declaration.map(Matched::Global),
                out,
            )
        }
        Particle::Any { wildcard, occurs } => consume_matching(
            children,
            start,
            *occurs,
            "xs:any",
            |child| wildcard.matches(&child.name),
            || Some(Matched::Wildcard(wildcard)),
            out,
        ),
        Particle::Group(nested) => {
            consume_group(nested, nested.occurs, children, start, registry, out)
        }
        Particle::GroupRef { name, occurs } => match registry.lookup_group(name) {
            Some(referenced) => {
                consume_group(referenced, *occurs, children, start, registry, out)
            }
            None => start,
        },
    }
}

fn consume_matching<'a>(
    children: &[Element],
    start: usize,
    occurs: Occurs,
    particle_name: &str,
    matches: impl Fn(&Element) -> bool,
    declaration: impl Fn() -> Option<Matched<'a>>,
    out: &mut ContentMatch<'a>,
) -> usize {
    let mut pos = start;
    let mut count = 0usize;

    while let Some(child) = children.get(pos) {
        if !matches(child) {
            break;
        }
        if let Some(matched) = declaration() {
            out.assignments.push((pos, matched));
        }
        pos += 1;
        count += 1;
    }

    if !occurs.accepts(count) {
        out.errors.push(
            ChildrenValidationError::new(particle_name, occurs.min, occurs.max, count)
                .at_index(start),
        );
    }

    pos
}

fn particle_declaration<'a>(
    particle: &'a Particle,
    registry: &'a SchemaRegistry,
) -> Option<Matched<'a>> {
    match particle {
        Particle::Element { decl, .. } => Some(Matched::Decl(decl)),
        Particle::ElementRef { name, .. } => registry.lookup_element(name).map(Matched::Global),
        Particle::Any { wildcard, .. } => Some(Matched::Wildcard(wildcard)),
        _ => None,
    }
}

fn particle_admits(particle: &Particle, child: &Element, registry: &SchemaRegistry) -> bool {
    match particle {
        Particle::Element { decl, .. } => names_match(decl.qname(), &child.name),
        Particle::ElementRef { name, .. } => names_match(name, &child.name),
        Particle::Any { wildcard, .. } => wildcard.matches(&child.name),
        Particle::Group(nested) => group_admits(nested, child, registry),
        Particle::GroupRef { name, .. } => registry
            .lookup_group(name)
            .is_some_and(|g| group_admits(g, child, registry)),
    }
}

fn group_admits(group: &XsdGroup, child: &Element, registry: &SchemaRegistry) -> bool {
    match group.model {
        ModelType::Sequence => {
            for particle in &group.particles {
                if particle_admits(particle, child, registry) {
                    return true;
                }
                if !particle.is_emptiable() {
                    return false;
                }
            }
            false
        }
        ModelType::Choice | ModelType::All => group
            .particles
            .iter()
            .any(|p| particle_admits(p, child, registry)),
    }
}
