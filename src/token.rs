//! Token kinds, per-token flags, and the token record itself.
//!
//! The kind enum is deliberately flat and closed: classifier sweeps are big
//! `match` blocks over it, and keeping one dense enum beats any kind of
//! hierarchy for that access pattern.

use bitflags::bitflags;

/// Lexical/semantic classification of a token.
///
/// Kinds are progressively refined: the tokenizer produces the coarse ones
/// (`Word`, `Number`, `ParenOpen`, ...), later passes rewrite them into the
/// specific ones (`FuncDef`, `PtrType`, `SParenOpen`, ...).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Default)]
pub enum TokenKind {
    #[default]
    None,
    Whitespace,
    Newline,
    NlCont,
    Unknown,

    Word,
    Type,
    Number,
    NumberFp,
    String,
    StringMulti,
    Label,
    Tag,
    Annotation,

    // preprocessor
    Pound,
    PpConcat,
    Preproc,
    PreprocBody,
    PpDefine,
    PpDefined,
    PpInclude,
    PpIf,
    PpElse,
    PpEndif,
    PpUndef,
    PpError,
    PpLine,
    PpPragma,
    PpOther,
    Macro,
    MacroFunc,
    MacroOpen,
    MacroElse,
    MacroClose,

    // paired delimiters
    ParenOpen,
    ParenClose,
    SParenOpen,
    SParenClose,
    FParenOpen,
    FParenClose,
    TParenOpen,
    TParenClose,
    BraceOpen,
    BraceClose,
    VBraceOpen,
    VBraceClose,
    AngleOpen,
    AngleClose,
    SquareOpen,
    SquareClose,
    TSquare,

    // operators and punctuation
    Assign,
    Arith,
    Caret,
    Star,
    Plus,
    Minus,
    Amp,
    Deref,
    Addr,
    Neg,
    Pos,
    PtrType,
    Byref,
    Not,
    Inv,
    Bool,
    Compare,
    IncDecAfter,
    IncDecBefore,
    Member,
    C99Member,
    DcMember,
    Comma,
    Semicolon,
    VSemicolon,
    Ellipsis,
    Question,
    Lambda,

    // colons, refined by the label pass
    Colon,
    CondColon,
    CaseColon,
    LabelColon,
    TagColon,
    ClassColon,
    ConstrColon,
    BitColon,
    ForColon,
    DArrayColon,
    OcColon,
    OcDictColon,
    CsSqColon,

    // keywords and keyword-driven constructs
    Qualifier,
    Typedef,
    Struct,
    Union,
    Enum,
    EnumClass,
    Class,
    Namespace,
    Using,
    Template,
    DTemplate,
    Typename,
    Operator,
    OperatorVal,
    If,
    Else,
    ElseIf,
    For,
    While,
    WhileOfDo,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,
    Goto,
    Throw,
    Try,
    Catch,
    Finally,
    Synchronized,
    Sizeof,
    New,
    Delete,
    This,
    Base,
    Private,
    Attribute,
    Extern,
    Invariant,
    Delegate,
    Align,
    Assert,
    Getset,
    GetsetEmpty,
    State,
    DVersion,

    // casts
    CCast,
    CppCast,
    DCast,
    TypeCast,

    // functions
    Function,
    FuncDef,
    FuncProto,
    FuncCall,
    FuncCallUser,
    FuncClass,
    FuncCtorVar,
    FuncVar,
    FuncType,
    Destructor,
    CppLambda,
    CppLambdaRet,

    // wraps
    FuncWrap,
    TypeWrap,
    ProtoWrap,

    // embedded SQL
    SqlExec,
    SqlBegin,
    SqlEnd,
    SqlWord,

    // Objective-C
    OcAt,
    OcClass,
    OcProtocol,
    OcEnd,
    OcScope,
    OcSel,
    OcProperty,
    OcDynamic,
    OcMsg,
    OcMsgClass,
    OcMsgFunc,
    OcMsgName,
    OcMsgSpec,
    OcMsgDecl,
    OcBlockCaret,
    OcBlockExpr,
    OcBlockType,
    OcProtoList,
    OcRtype,

    // C#
    CsProperty,
    CsSqStmt,
}

impl TokenKind {
    /// The closing kind paired with an opening delimiter, if any.
    pub fn matching_close(self) -> Option<TokenKind> {
        use TokenKind as K;
        Some(match self {
            K::ParenOpen => K::ParenClose,
            K::SParenOpen => K::SParenClose,
            K::FParenOpen => K::FParenClose,
            K::TParenOpen => K::TParenClose,
            K::BraceOpen => K::BraceClose,
            K::VBraceOpen => K::VBraceClose,
            K::AngleOpen => K::AngleClose,
            K::SquareOpen => K::SquareClose,
            _ => return Option::None,
        })
    }

    /// The opening kind paired with a closing delimiter, if any.
    pub fn matching_open(self) -> Option<TokenKind> {
        use TokenKind as K;
        Some(match self {
            K::ParenClose => K::ParenOpen,
            K::SParenClose => K::SParenOpen,
            K::FParenClose => K::FParenOpen,
            K::TParenClose => K::TParenOpen,
            K::BraceClose => K::BraceOpen,
            K::VBraceClose => K::VBraceOpen,
            K::AngleClose => K::AngleOpen,
            K::SquareClose => K::SquareOpen,
            _ => return Option::None,
        })
    }

    pub fn is_paren_open(self) -> bool {
        matches!(
            self,
            TokenKind::ParenOpen
                | TokenKind::SParenOpen
                | TokenKind::FParenOpen
                | TokenKind::TParenOpen
        )
    }

    pub fn is_paren_close(self) -> bool {
        matches!(
            self,
            TokenKind::ParenClose
                | TokenKind::SParenClose
                | TokenKind::FParenClose
                | TokenKind::TParenClose
        )
    }

    /// Preprocessor sub-kinds whose bodies are consumed as one opaque chunk.
    pub fn is_unhandled_preproc(self) -> bool {
        matches!(
            self,
            TokenKind::PpUndef
                | TokenKind::PpError
                | TokenKind::PpLine
                | TokenKind::PpPragma
                | TokenKind::PpOther
        )
    }

    pub fn is_preproc_kind(self) -> bool {
        matches!(
            self,
            TokenKind::PpDefine
                | TokenKind::PpInclude
                | TokenKind::PpIf
                | TokenKind::PpElse
                | TokenKind::PpEndif
                | TokenKind::PpUndef
                | TokenKind::PpError
                | TokenKind::PpLine
                | TokenKind::PpPragma
                | TokenKind::PpOther
        )
    }

    pub fn name(self) -> &'static str {
        // Debug names are stable and already uppercase-free; the dump format
        // wants shouty names, so keep an explicit table for the common ones
        // and fall back to the debug form.
        use TokenKind::*;
        match self {
            None => "NONE",
            Whitespace => "WHITESPACE",
            Newline => "NEWLINE",
            NlCont => "NL_CONT",
            Unknown => "UNKNOWN",
            Word => "WORD",
            Type => "TYPE",
            Number => "NUMBER",
            NumberFp => "NUMBER_FP",
            String => "STRING",
            StringMulti => "STRING_MULTI",
            Label => "LABEL",
            Tag => "TAG",
            Annotation => "ANNOTATION",
            Pound => "POUND",
            PpConcat => "PP_CONCAT",
            Preproc => "PREPROC",
            PreprocBody => "PREPROC_BODY",
            PpDefine => "PP_DEFINE",
            PpDefined => "PP_DEFINED",
            PpInclude => "PP_INCLUDE",
            PpIf => "PP_IF",
            PpElse => "PP_ELSE",
            PpEndif => "PP_ENDIF",
            PpUndef => "PP_UNDEF",
            PpError => "PP_ERROR",
            PpLine => "PP_LINE",
            PpPragma => "PP_PRAGMA",
            PpOther => "PP_OTHER",
            Macro => "MACRO",
            MacroFunc => "MACRO_FUNC",
            MacroOpen => "MACRO_OPEN",
            MacroElse => "MACRO_ELSE",
            MacroClose => "MACRO_CLOSE",
            ParenOpen => "PAREN_OPEN",
            ParenClose => "PAREN_CLOSE",
            SParenOpen => "SPAREN_OPEN",
            SParenClose => "SPAREN_CLOSE",
            FParenOpen => "FPAREN_OPEN",
            FParenClose => "FPAREN_CLOSE",
            TParenOpen => "TPAREN_OPEN",
            TParenClose => "TPAREN_CLOSE",
            BraceOpen => "BRACE_OPEN",
            BraceClose => "BRACE_CLOSE",
            VBraceOpen => "VBRACE_OPEN",
            VBraceClose => "VBRACE_CLOSE",
            AngleOpen => "ANGLE_OPEN",
            AngleClose => "ANGLE_CLOSE",
            SquareOpen => "SQUARE_OPEN",
            SquareClose => "SQUARE_CLOSE",
            TSquare => "TSQUARE",
            Assign => "ASSIGN",
            Arith => "ARITH",
            Caret => "CARET",
            Star => "STAR",
            Plus => "PLUS",
            Minus => "MINUS",
            Amp => "AMP",
            Deref => "DEREF",
            Addr => "ADDR",
            Neg => "NEG",
            Pos => "POS",
            PtrType => "PTR_TYPE",
            Byref => "BYREF",
            Not => "NOT",
            Inv => "INV",
            Bool => "BOOL",
            Compare => "COMPARE",
            IncDecAfter => "INCDEC_AFTER",
            IncDecBefore => "INCDEC_BEFORE",
            Member => "MEMBER",
            C99Member => "C99_MEMBER",
            DcMember => "DC_MEMBER",
            Comma => "COMMA",
            Semicolon => "SEMICOLON",
            VSemicolon => "VSEMICOLON",
            Ellipsis => "ELLIPSIS",
            Question => "QUESTION",
            Lambda => "LAMBDA",
            Colon => "COLON",
            CondColon => "COND_COLON",
            CaseColon => "CASE_COLON",
            LabelColon => "LABEL_COLON",
            TagColon => "TAG_COLON",
            ClassColon => "CLASS_COLON",
            ConstrColon => "CONSTR_COLON",
            BitColon => "BIT_COLON",
            ForColon => "FOR_COLON",
            DArrayColon => "D_ARRAY_COLON",
            OcColon => "OC_COLON",
            OcDictColon => "OC_DICT_COLON",
            CsSqColon => "CS_SQ_COLON",
            Qualifier => "QUALIFIER",
            Typedef => "TYPEDEF",
            Struct => "STRUCT",
            Union => "UNION",
            Enum => "ENUM",
            EnumClass => "ENUM_CLASS",
            Class => "CLASS",
            Namespace => "NAMESPACE",
            Using => "USING",
            Template => "TEMPLATE",
            DTemplate => "D_TEMPLATE",
            Typename => "TYPENAME",
            Operator => "OPERATOR",
            OperatorVal => "OPERATOR_VAL",
            If => "IF",
            Else => "ELSE",
            ElseIf => "ELSEIF",
            For => "FOR",
            While => "WHILE",
            WhileOfDo => "WHILE_OF_DO",
            Do => "DO",
            Switch => "SWITCH",
            Case => "CASE",
            Default => "DEFAULT",
            Break => "BREAK",
            Continue => "CONTINUE",
            Return => "RETURN",
            Goto => "GOTO",
            Throw => "THROW",
            Try => "TRY",
            Catch => "CATCH",
            Finally => "FINALLY",
            Synchronized => "SYNCHRONIZED",
            Sizeof => "SIZEOF",
            New => "NEW",
            Delete => "DELETE",
            This => "THIS",
            Base => "BASE",
            Private => "PRIVATE",
            Attribute => "ATTRIBUTE",
            Extern => "EXTERN",
            Invariant => "INVARIANT",
            Delegate => "DELEGATE",
            Align => "ALIGN",
            Assert => "ASSERT",
            Getset => "GETSET",
            GetsetEmpty => "GETSET_EMPTY",
            State => "STATE",
            DVersion => "D_VERSION",
            CCast => "C_CAST",
            CppCast => "CPP_CAST",
            DCast => "D_CAST",
            TypeCast => "TYPE_CAST",
            Function => "FUNCTION",
            FuncDef => "FUNC_DEF",
            FuncProto => "FUNC_PROTO",
            FuncCall => "FUNC_CALL",
            FuncCallUser => "FUNC_CALL_USER",
            FuncClass => "FUNC_CLASS",
            FuncCtorVar => "FUNC_CTOR_VAR",
            FuncVar => "FUNC_VAR",
            FuncType => "FUNC_TYPE",
            Destructor => "DESTRUCTOR",
            CppLambda => "CPP_LAMBDA",
            CppLambdaRet => "CPP_LAMBDA_RET",
            FuncWrap => "FUNC_WRAP",
            TypeWrap => "TYPE_WRAP",
            ProtoWrap => "PROTO_WRAP",
            SqlExec => "SQL_EXEC",
            SqlBegin => "SQL_BEGIN",
            SqlEnd => "SQL_END",
            SqlWord => "SQL_WORD",
            OcAt => "OC_AT",
            OcClass => "OC_CLASS",
            OcProtocol => "OC_PROTOCOL",
            OcEnd => "OC_END",
            OcScope => "OC_SCOPE",
            OcSel => "OC_SEL",
            OcProperty => "OC_PROPERTY",
            OcDynamic => "OC_DYNAMIC",
            OcMsg => "OC_MSG",
            OcMsgClass => "OC_MSG_CLASS",
            OcMsgFunc => "OC_MSG_FUNC",
            OcMsgName => "OC_MSG_NAME",
            OcMsgSpec => "OC_MSG_SPEC",
            OcMsgDecl => "OC_MSG_DECL",
            OcBlockCaret => "OC_BLOCK_CARET",
            OcBlockExpr => "OC_BLOCK_EXPR",
            OcBlockType => "OC_BLOCK_TYPE",
            OcProtoList => "OC_PROTO_LIST",
            OcRtype => "OC_RTYPE",
            CsProperty => "CS_PROPERTY",
            CsSqStmt => "CS_SQ_STMT",
        }
    }
}

bitflags! {
    /// Per-token flag bits.
    ///
    /// The lower 16 bits are "copy" flags: tokens inserted next to an
    /// existing token inherit them wholesale via `COPY_FLAGS`.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct TokenFlags: u64 {
        const IN_PREPROC      = 1 << 0;
        const IN_STRUCT       = 1 << 1;
        const IN_ENUM         = 1 << 2;
        const IN_FCN_DEF      = 1 << 3;
        const IN_FCN_CALL     = 1 << 4;
        const IN_SPAREN       = 1 << 5;
        const IN_TEMPLATE     = 1 << 6;
        const IN_TYPEDEF      = 1 << 7;
        const IN_CONST_ARGS   = 1 << 8;
        const IN_ARRAY_ASSIGN = 1 << 9;
        const IN_CLASS        = 1 << 10;
        const IN_CLASS_BASE   = 1 << 11;
        const IN_NAMESPACE    = 1 << 12;
        const IN_FOR          = 1 << 13;
        const IN_OC_MSG       = 1 << 14;

        const STMT_START      = 1 << 17;
        const EXPR_START      = 1 << 18;
        const VAR_TYPE        = 1 << 22;
        const VAR_DEF         = 1 << 23;
        const VAR_DECL        = 1 << 24;
        const VAR_INLINE      = 1 << 25;
        const LVALUE          = 1 << 28;
        const ONE_LINER       = 1 << 29;
        const PUNCTUATOR      = 1 << 32;
        const KEYWORD         = 1 << 33;
        const OC_BOXED        = 1 << 35;
        const STATIC          = 1 << 36;
        const OC_RTYPE        = 1 << 37;
        const OC_ATYPE        = 1 << 38;
        const DEF             = 1 << 39;
        const PROTO           = 1 << 40;
        const REF             = 1 << 41;
        const TYPEDEF_STRUCT  = 1 << 42;
        const TYPEDEF_UNION   = 1 << 43;
        const TYPEDEF_ENUM    = 1 << 44;
    }
}

impl TokenFlags {
    /// The inheritable lower 16 bits.
    pub const COPY_FLAGS: TokenFlags = TokenFlags::from_bits_truncate(0xffff);

    /// Comma-separated flag names for the diagnostic dump.
    pub fn describe(self) -> String {
        const NAMES: &[(TokenFlags, &str)] = &[
            (TokenFlags::IN_PREPROC, "IN_PREPROC"),
            (TokenFlags::IN_STRUCT, "IN_STRUCT"),
            (TokenFlags::IN_ENUM, "IN_ENUM"),
            (TokenFlags::IN_FCN_DEF, "IN_FCN_DEF"),
            (TokenFlags::IN_FCN_CALL, "IN_FCN_CALL"),
            (TokenFlags::IN_SPAREN, "IN_SPAREN"),
            (TokenFlags::IN_TEMPLATE, "IN_TEMPLATE"),
            (TokenFlags::IN_TYPEDEF, "IN_TYPEDEF"),
            (TokenFlags::IN_CONST_ARGS, "IN_CONST_ARGS"),
            (TokenFlags::IN_ARRAY_ASSIGN, "IN_ARRAY_ASSIGN"),
            (TokenFlags::IN_CLASS, "IN_CLASS"),
            (TokenFlags::IN_CLASS_BASE, "IN_CLASS_BASE"),
            (TokenFlags::IN_NAMESPACE, "IN_NAMESPACE"),
            (TokenFlags::IN_FOR, "IN_FOR"),
            (TokenFlags::IN_OC_MSG, "IN_OC_MSG"),
            (TokenFlags::STMT_START, "STMT_START"),
            (TokenFlags::EXPR_START, "EXPR_START"),
            (TokenFlags::VAR_TYPE, "VAR_TYPE"),
            (TokenFlags::VAR_DEF, "VAR_DEF"),
            (TokenFlags::VAR_DECL, "VAR_DECL"),
            (TokenFlags::VAR_INLINE, "VAR_INLINE"),
            (TokenFlags::LVALUE, "LVALUE"),
            (TokenFlags::ONE_LINER, "ONE_LINER"),
            (TokenFlags::PUNCTUATOR, "PUNCTUATOR"),
            (TokenFlags::KEYWORD, "KEYWORD"),
            (TokenFlags::OC_BOXED, "OC_BOXED"),
            (TokenFlags::STATIC, "STATIC"),
            (TokenFlags::OC_RTYPE, "OC_RTYPE"),
            (TokenFlags::OC_ATYPE, "OC_ATYPE"),
            (TokenFlags::DEF, "DEF"),
            (TokenFlags::PROTO, "PROTO"),
            (TokenFlags::REF, "REF"),
            (TokenFlags::TYPEDEF_STRUCT, "TYPEDEF_STRUCT"),
            (TokenFlags::TYPEDEF_UNION, "TYPEDEF_UNION"),
            (TokenFlags::TYPEDEF_ENUM, "TYPEDEF_ENUM"),
        ];
        let mut out = String::new();
        for (flag, name) in NAMES {
            if self.contains(*flag) {
                if !out.is_empty() {
                    out.push(',');
                }
                out.push_str(name);
            }
        }
        out
    }
}

/// One lexical atom, progressively annotated by the pipeline.
#[derive(Clone, Debug, Default)]
pub struct Token {
    pub kind: TokenKind,
    pub parent: TokenKind,
    pub line: u32,
    pub col: u32,
    pub col_end: u32,
    pub flags: TokenFlags,
    pub level: u32,
    pub brace_level: u32,
    pub pp_level: u32,
    pub text: String,
    pub scope: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Token {
            kind,
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::NlCont)
    }

    pub fn is_semicolon(&self) -> bool {
        matches!(self.kind, TokenKind::Semicolon | TokenKind::VSemicolon)
    }

    pub fn is_preproc(&self) -> bool {
        self.flags.contains(TokenFlags::IN_PREPROC)
    }

    /// Token that can appear inside a type expression.
    pub fn is_type_like(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Type
                | TokenKind::PtrType
                | TokenKind::Byref
                | TokenKind::DcMember
                | TokenKind::Qualifier
                | TokenKind::Struct
                | TokenKind::Enum
                | TokenKind::Union
        )
    }

    /// A bare `*` that has not been claimed by operator overloading.
    pub fn is_star(&self) -> bool {
        self.text == "*" && self.kind != TokenKind::OperatorVal
    }

    /// A `&` byref or a bare `&`.
    pub fn is_addr(&self) -> bool {
        self.kind == TokenKind::Byref
            || (self.text == "&" && self.kind != TokenKind::OperatorVal)
    }

    /// Starts with an identifier-start character (used where the original
    /// bytes matter more than the refined kind).
    pub fn is_word_like(&self) -> bool {
        self.text
            .bytes()
            .next()
            .is_some_and(crate::tokenize::is_word_start)
    }

    pub fn is_paren_open(&self) -> bool {
        self.kind.is_paren_open()
    }

    pub fn is_paren_close(&self) -> bool {
        self.kind.is_paren_close()
    }

    pub fn is_opening_brace(&self) -> bool {
        matches!(self.kind, TokenKind::BraceOpen | TokenKind::VBraceOpen)
    }

    pub fn is_closing_brace(&self) -> bool {
        matches!(self.kind, TokenKind::BraceClose | TokenKind::VBraceClose)
    }

    pub fn is_vbrace(&self) -> bool {
        matches!(self.kind, TokenKind::VBraceOpen | TokenKind::VBraceClose)
    }

    pub fn is_str(&self, s: &str) -> bool {
        self.text == s
    }
}

/// Entity classification for emitted identifier rows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdKind {
    Identifier,
    Macro,
    MacroFunction,
    Function,
    Struct,
    Union,
    Enum,
    EnumVal,
    Class,
    StructType,
    UnionType,
    EnumType,
    FunctionType,
    Type,
    Var,
    Namespace,
}

impl IdKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Identifier => "IDENTIFIER",
            IdKind::Macro => "MACRO",
            IdKind::MacroFunction => "MACRO_FUNCTION",
            IdKind::Function => "FUNCTION",
            IdKind::Struct => "STRUCT",
            IdKind::Union => "UNION",
            IdKind::Enum => "ENUM",
            IdKind::EnumVal => "ENUM_VAL",
            IdKind::Class => "CLASS",
            IdKind::StructType => "STRUCT_TYPE",
            IdKind::UnionType => "UNION_TYPE",
            IdKind::EnumType => "ENUM_TYPE",
            IdKind::FunctionType => "FUNCTION_TYPE",
            IdKind::Type => "TYPE",
            IdKind::Var => "VAR",
            IdKind::Namespace => "NAMESPACE",
        }
    }
}

/// Occurrence role for emitted identifier rows.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum IdRole {
    Reference,
    Definition,
    Declaration,
}

impl IdRole {
    pub fn as_str(self) -> &'static str {
        match self {
            IdRole::Reference => "REF",
            IdRole::Definition => "DEF",
            IdRole::Declaration => "DECL",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_pairing_is_symmetric() {
        for open in [
            TokenKind::ParenOpen,
            TokenKind::SParenOpen,
            TokenKind::FParenOpen,
            TokenKind::TParenOpen,
            TokenKind::BraceOpen,
            TokenKind::VBraceOpen,
            TokenKind::AngleOpen,
            TokenKind::SquareOpen,
        ] {
            let close = open.matching_close().unwrap();
            assert_eq!(close.matching_open(), Some(open));
        }
        assert_eq!(TokenKind::Word.matching_close(), None);
    }

    #[test]
    fn copy_flags_cover_lower_bits_only() {
        assert!(TokenFlags::COPY_FLAGS.contains(TokenFlags::IN_OC_MSG));
        assert!(!TokenFlags::COPY_FLAGS.contains(TokenFlags::STMT_START));
        assert!(!TokenFlags::COPY_FLAGS.contains(TokenFlags::DEF));
    }

    #[test]
    fn flag_names_round_trip() {
        let flags = TokenFlags::IN_PREPROC | TokenFlags::VAR_DEF;
        assert_eq!(flags.describe(), "IN_PREPROC,VAR_DEF");
        assert_eq!(TokenFlags::empty().describe(), "");
    }
}
