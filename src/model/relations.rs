//! Eager-load requests: dotted relation paths resolved against descriptors into an include tree.

use crate::case::to_snake_case;
use crate::model::{RecordDescriptor, RelationDescriptor};

/// One relation to load alongside its parent, with the relations to load below it.
#[derive(Clone, Debug)]
pub struct Include {
    pub relation: &'static RelationDescriptor,
    pub nested: Vec<Include>,
}

impl Include {
    pub fn child(&self) -> &'static RecordDescriptor {
        self.relation.child()
    }
}

/// Resolve relation paths such as `merchant` or `Merchant.Product` into a merged include tree.
/// A nested path also loads every relation on its way. Segments match a relation name exactly,
/// or after CamelCase → snake_case conversion, ignoring ASCII case.
pub fn resolve_includes<S: AsRef<str>>(
    descriptor: &'static RecordDescriptor,
    paths: &[S],
) -> Result<Vec<Include>, String> {
    let mut roots: Vec<Include> = Vec::new();
    for path in paths {
        let path = path.as_ref().trim();
        if path.is_empty() {
            continue;
        }
        let mut level = &mut roots;
        let mut current = descriptor;
        for segment in path.split('.') {
            let relation = find_relation(current, segment)
                .ok_or_else(|| format!("unknown relation '{}' on {}", path, descriptor.name))?;
            let pos = match level.iter().position(|i| std::ptr::eq(i.relation, relation)) {
                Some(pos) => pos,
                None => {
                    level.push(Include {
                        relation,
                        nested: Vec::new(),
                    });
                    level.len() - 1
                }
            };
            current = relation.child();
            level = &mut level[pos].nested;
        }
    }
    Ok(roots)
}

fn find_relation(
    descriptor: &'static RecordDescriptor,
    segment: &str,
) -> Option<&'static RelationDescriptor> {
    let segment = segment.trim();
    descriptor.relation(segment).or_else(|| {
        let snake = to_snake_case(segment);
        descriptor
            .relations
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(segment) || r.name.eq_ignore_ascii_case(&snake))
    })
}
