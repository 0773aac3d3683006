/// Whether a method may be invoked over RPC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// Where a call came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
    /// A client, over the RPC transport
    Remote,
    /// Code in this process
    Local,
}

/// A closed list of the methods one kind of object exposes.
///
/// Remote callers can only reach entries marked `Public`, and never a name
/// beginning with an underscore, whatever the table says about it.
#[derive(Debug)]
pub struct MethodTable<M: 'static> {
    entries: &'static [(&'static str, Visibility, M)],
}

impl<M: 'static> MethodTable<M> {
    pub const fn new(entries: &'static [(&'static str, Visibility, M)]) -> Self {
        Self { entries }
    }
}

impl<M: Copy + 'static> MethodTable<M> {
    pub fn lookup(&self, name: &str, caller: Caller) -> Option<M> {
        let (_, visibility, method) = self.entries.iter().find(|(n, _, _)| *n == name)?;

        match caller {
            Caller::Local => Some(*method),
            Caller::Remote if name.starts_with('_') || *visibility == Visibility::Private => None,
            Caller::Remote => Some(*method),
        }
    }

    /// Names visible to the given caller
    pub fn names(&self, caller: Caller) -> impl Iterator<Item = &'static str> + '_ {
        self.entries
            .iter()
            .filter(move |(name, _, _)| self.lookup(name, caller).is_some())
            .map(|(name, _, _)| *name)
    }
}
