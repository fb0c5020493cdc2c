//! Generic helpers over id-tagged trees. Every lookup searches the whole
//! tree, not just the top level.

pub trait TreeNode: Sized {
    type Id: PartialEq + Copy;

    fn id(&self) -> Self::Id;
    fn children(&self) -> &[Self];
    fn children_mut(&mut self) -> &mut Vec<Self>;
}

pub fn find<N: TreeNode>(nodes: &[N], id: N::Id) -> Option<&N> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find(node.children(), id) {
            return Some(found);
        }
    }
    None
}

pub fn find_mut<N: TreeNode>(nodes: &mut [N], id: N::Id) -> Option<&mut N> {
    for node in nodes.iter_mut() {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_mut(node.children_mut(), id) {
            return Some(found);
        }
    }
    None
}

/// Parent id (`None` for a root) and index of the node within its siblings.
pub fn locate<N: TreeNode>(nodes: &[N], id: N::Id) -> Option<(Option<N::Id>, usize)> {
    fn walk<N: TreeNode>(
        nodes: &[N],
        parent: Option<N::Id>,
        id: N::Id,
    ) -> Option<(Option<N::Id>, usize)> {
        if let Some(index) = nodes.iter().position(|node| node.id() == id) {
            return Some((parent, index));
        }
        nodes
            .iter()
            .find_map(|node| walk(node.children(), Some(node.id()), id))
    }
    walk(nodes, None, id)
}

pub fn update<N: TreeNode>(nodes: &mut [N], id: N::Id, f: impl FnOnce(&mut N)) -> bool {
    match find_mut(nodes, id) {
        Some(node) => {
            f(node);
            true
        }
        None => false,
    }
}

/// Detaches the node together with its subtree.
pub fn remove<N: TreeNode>(nodes: &mut Vec<N>, id: N::Id) -> Option<N> {
    if let Some(index) = nodes.iter().position(|node| node.id() == id) {
        return Some(nodes.remove(index));
    }
    for node in nodes.iter_mut() {
        if let Some(removed) = remove(node.children_mut(), id) {
            return Some(removed);
        }
    }
    None
}

/// Inserts under `parent` (or at the root) at `index`, clamped to the
/// sibling count. Hands the node back if the parent is gone.
pub fn insert<N: TreeNode>(
    nodes: &mut Vec<N>,
    parent: Option<N::Id>,
    index: usize,
    node: N,
) -> Result<(), N> {
    let siblings = match parent {
        None => nodes,
        Some(parent) => match find_mut(nodes, parent) {
            Some(parent) => parent.children_mut(),
            None => return Err(node),
        },
    };
    let index = index.min(siblings.len());
    siblings.insert(index, node);
    Ok(())
}

/// Depth-first walk yielding `(depth, node)`; children are only visited
/// when `descend` accepts their parent.
pub fn flatten<'a, N: TreeNode>(
    nodes: &'a [N],
    descend: &impl Fn(&N) -> bool,
) -> Vec<(usize, &'a N)> {
    fn walk<'a, N: TreeNode>(
        nodes: &'a [N],
        depth: usize,
        descend: &impl Fn(&N) -> bool,
        out: &mut Vec<(usize, &'a N)>,
    ) {
        for node in nodes {
            out.push((depth, node));
            if descend(node) {
                walk(node.children(), depth + 1, descend, out);
            }
        }
    }

    let mut out = vec![];
    walk(nodes, 0, descend, &mut out);
    out
}

pub fn ids<N: TreeNode>(nodes: &[N]) -> Vec<N::Id> {
    flatten(nodes, &|_| true)
        .into_iter()
        .map(|(_, node)| node.id())
        .collect()
}
