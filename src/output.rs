//! Projection of classified tokens into identifier rows, plus the
//! diagnostic token dump.

use anyhow::Result;

use crate::context::FileContext;
use crate::token::{IdKind, IdRole, TokenFlags, TokenKind};

/// One identifier occurrence, ready for printing or persisting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub line: u32,
    pub col: u32,
    pub col_end: u32,
    pub scope: String,
    pub kind: IdKind,
    pub role: IdRole,
    pub identifier: String,
}

/// Where emitted entries go. The SQLite store implements this; tests use a
/// plain vector.
pub trait EntrySink {
    fn entry(&mut self, entry: Entry) -> Result<()>;
}

impl EntrySink for Vec<Entry> {
    fn entry(&mut self, entry: Entry) -> Result<()> {
        self.push(entry);
        Ok(())
    }
}

fn role_from_flags(flags: TokenFlags) -> Option<IdRole> {
    if flags.contains(TokenFlags::DEF) {
        Some(IdRole::Definition)
    } else if flags.contains(TokenFlags::PROTO) {
        Some(IdRole::Declaration)
    } else if flags.contains(TokenFlags::REF) {
        Some(IdRole::Reference)
    } else {
        None
    }
}

/// Map one token into an entry, or `None` for tokens that are not indexed.
fn classify_token(
    kind: TokenKind,
    parent: TokenKind,
    flags: TokenFlags,
) -> Option<(IdKind, IdRole)> {
    use TokenKind as K;
    match kind {
        K::FuncDef => Some((IdKind::Function, IdRole::Definition)),
        K::FuncProto => Some((IdKind::Function, IdRole::Declaration)),
        K::FuncCall | K::FuncCallUser => Some((IdKind::Function, IdRole::Reference)),
        K::FuncClass => Some((IdKind::Function, role_from_flags(flags)?)),
        K::OcMsgDecl => Some((IdKind::Function, IdRole::Definition)),
        K::OcMsgSpec => Some((IdKind::Function, IdRole::Declaration)),
        K::MacroFunc => Some((IdKind::MacroFunction, IdRole::Definition)),
        K::Macro => Some((IdKind::Macro, IdRole::Definition)),
        K::Type => {
            if flags.contains(TokenFlags::KEYWORD) {
                return None;
            }
            match parent {
                K::Typedef => {
                    let alias = if flags.contains(TokenFlags::TYPEDEF_STRUCT) {
                        IdKind::StructType
                    } else if flags.contains(TokenFlags::TYPEDEF_UNION) {
                        IdKind::UnionType
                    } else if flags.contains(TokenFlags::TYPEDEF_ENUM) {
                        IdKind::EnumType
                    } else {
                        IdKind::Type
                    };
                    Some((alias, IdRole::Definition))
                }
                K::Struct => Some((IdKind::Struct, role_from_flags(flags)?)),
                K::Union => Some((IdKind::Union, role_from_flags(flags)?)),
                K::Enum => Some((IdKind::Enum, role_from_flags(flags)?)),
                K::Class | K::OcClass => Some((IdKind::Class, role_from_flags(flags)?)),
                _ => Some((IdKind::Type, IdRole::Reference)),
            }
        }
        K::FuncType => Some((IdKind::FunctionType, IdRole::Definition)),
        K::FuncCtorVar | K::FuncVar | K::Word => match parent {
            K::None => {
                if flags.contains(TokenFlags::IN_ENUM) {
                    Some((IdKind::EnumVal, IdRole::Definition))
                } else if flags.contains(TokenFlags::VAR_DEF) {
                    Some((IdKind::Var, IdRole::Definition))
                } else if flags.contains(TokenFlags::VAR_DECL) {
                    Some((IdKind::Var, IdRole::Declaration))
                } else if kind == K::Word {
                    Some((IdKind::Identifier, IdRole::Reference))
                } else {
                    Some((IdKind::Var, IdRole::Reference))
                }
            }
            K::Namespace => Some((IdKind::Namespace, role_from_flags(flags)?)),
            _ => None,
        },
        _ => None,
    }
}

/// Emit one row per recognized identifier occurrence.
pub fn emit(ctx: &FileContext, sink: &mut dyn EntrySink) -> Result<()> {
    for id in ctx.tokens.ids() {
        let tok = ctx.tokens.tok(id);
        if tok.flags.contains(TokenFlags::PUNCTUATOR) {
            continue;
        }
        let Some((kind, role)) = classify_token(tok.kind, tok.parent, tok.flags) else {
            continue;
        };
        sink.entry(Entry {
            line: tok.line,
            col: tok.col,
            col_end: tok.col_end,
            scope: tok.scope.clone(),
            kind,
            role,
            identifier: tok.text.clone(),
        })?;
    }
    Ok(())
}

/// Print the emitted rows in the classic `file:line:col` form.
pub fn print_entries(filename: &str, entries: &[Entry]) {
    for e in entries {
        println!(
            "{}:{}:{}:{} {} {} {} {}",
            filename,
            e.line,
            e.col,
            e.col_end,
            e.scope,
            e.kind.as_str(),
            e.role.as_str(),
            e.identifier
        );
    }
}

/// The diagnostic dump: one line per token with all annotations.
pub fn dump_tokens(ctx: &FileContext, out: &mut dyn std::io::Write) -> Result<()> {
    for id in ctx.tokens.ids() {
        let tok = ctx.tokens.tok(id);
        writeln!(
            out,
            "{:>4} {:<14} {:<14} {:<12} [{}-{}][{}/{}/{}] {} {}",
            tok.line,
            tok.kind.name(),
            tok.parent.name(),
            if tok.scope.is_empty() { "-" } else { &tok.scope },
            tok.col,
            tok.col_end,
            tok.brace_level,
            tok.level,
            tok.pp_level,
            if tok.is_newline() { "" } else { &tok.text },
            tok.flags.describe()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_types_are_skipped() {
        assert_eq!(
            classify_token(TokenKind::Type, TokenKind::None, TokenFlags::KEYWORD),
            None
        );
    }

    #[test]
    fn typedef_flags_pick_the_alias_kind() {
        let got = classify_token(
            TokenKind::Type,
            TokenKind::Typedef,
            TokenFlags::TYPEDEF_STRUCT,
        );
        assert_eq!(got, Some((IdKind::StructType, IdRole::Definition)));
        let got = classify_token(TokenKind::Type, TokenKind::Typedef, TokenFlags::empty());
        assert_eq!(got, Some((IdKind::Type, IdRole::Definition)));
    }

    #[test]
    fn plain_type_mentions_are_references() {
        assert_eq!(
            classify_token(TokenKind::Type, TokenKind::None, TokenFlags::empty()),
            Some((IdKind::Type, IdRole::Reference))
        );
    }

    #[test]
    fn words_follow_their_flags() {
        assert_eq!(
            classify_token(TokenKind::Word, TokenKind::None, TokenFlags::VAR_DEF),
            Some((IdKind::Var, IdRole::Definition))
        );
        assert_eq!(
            classify_token(TokenKind::Word, TokenKind::None, TokenFlags::IN_ENUM),
            Some((IdKind::EnumVal, IdRole::Definition))
        );
        assert_eq!(
            classify_token(TokenKind::Word, TokenKind::None, TokenFlags::empty()),
            Some((IdKind::Identifier, IdRole::Reference))
        );
        // an unmapped parent is skipped entirely
        assert_eq!(
            classify_token(TokenKind::Word, TokenKind::OcMsgName, TokenFlags::empty()),
            None
        );
    }

    #[test]
    fn ctor_vars_without_flags_are_var_references() {
        assert_eq!(
            classify_token(TokenKind::FuncCtorVar, TokenKind::None, TokenFlags::empty()),
            Some((IdKind::Var, IdRole::Reference))
        );
        assert_eq!(
            classify_token(TokenKind::FuncCtorVar, TokenKind::None, TokenFlags::VAR_DEF),
            Some((IdKind::Var, IdRole::Definition))
        );
    }
}
