use watchtree::accessor::path;
use watchtree::{NodeId, Repeat, RepeatTarget, ScopeId, ScopeTree, SharedRenderer};

use crate::DirectiveError;

/// Parsed `item in collection` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatExpression {
    pub item: String,
    pub collection: String,
}

impl RepeatExpression {
    /// Split on the last standalone `in`. The item must be a plain name; the
    /// collection is everything after, whitespace-normalized.
    pub fn parse(source: &str) -> Result<Self, DirectiveError> {
        let invalid = || DirectiveError::InvalidExpression(source.to_owned());
        let words: Vec<&str> = source.split_whitespace().collect();
        let split = words
            .iter()
            .rposition(|word| *word == "in")
            .ok_or_else(invalid)?;
        let (item, collection) = (&words[..split], &words[split + 1..]);

        let [item] = item else {
            return Err(invalid());
        };
        if collection.is_empty()
            || !item
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            return Err(invalid());
        }
        Ok(Self {
            item: (*item).to_owned(),
            collection: collection.join(" "),
        })
    }
}

/// Repeat the nodes under `target` once per item of the expression's
/// collection. `link` binds each new item's directives.
pub fn repeat<F>(
    tree: &mut ScopeTree,
    host: ScopeId,
    expression: &str,
    renderer: SharedRenderer,
    target: RepeatTarget,
    link: F,
) -> Result<Repeat, DirectiveError>
where
    F: FnMut(&mut ScopeTree, ScopeId, NodeId) + 'static,
{
    let expression = RepeatExpression::parse(expression)?;
    let collection = path(&expression.collection)?;
    let repeat = Repeat::builder(expression.item, renderer, target)
        .link(link)
        .attach(tree, host, collection)?;
    Ok(repeat)
}
