//! Typed subset of clang's `-ast-dump=json` output.
//!
//! Every variant deserializes `loc` and `range`: clang omits the `file`
//! key when it repeats, and clang-ast can only track the current file if
//! it sees every location in the stream.

use clang_ast::{BareSourceLocation, Id, SourceLocation, SourceRange};
use serde::Deserialize;

pub type Node = clang_ast::Node<Clang>;

#[derive(Deserialize, Debug)]
pub enum Clang {
    FunctionDecl(DeclData),
    CXXMethodDecl(DeclData),
    CXXConstructorDecl(DeclData),
    CXXDestructorDecl(DeclData),
    RecordDecl(DeclData),
    CXXRecordDecl(DeclData),
    VarDecl(DeclData),
    FieldDecl(DeclData),
    ParmVarDecl(DeclData),
    TypedefDecl(DeclData),
    TypeAliasDecl(DeclData),
    EnumDecl(DeclData),
    EnumConstantDecl(DeclData),
    NamespaceDecl(DeclData),
    FunctionTemplateDecl(DeclData),
    ClassTemplateDecl(DeclData),
    CompoundStmt(ExprData),
    CallExpr(ExprData),
    CXXMemberCallExpr(ExprData),
    DeclRefExpr(RefExprData),
    MemberExpr(RefExprData),
    Other {
        kind: clang_ast::Kind,
        #[serde(default)]
        loc: Option<SourceLocation>,
        #[serde(default)]
        range: Option<SourceRange>,
        #[serde(default, rename = "type")]
        ty: Option<QualType>,
    },
}

#[derive(Deserialize, Debug)]
pub struct DeclData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub loc: Option<SourceLocation>,
    #[serde(default)]
    pub range: Option<SourceRange>,
    #[serde(default, rename = "isImplicit")]
    pub is_implicit: bool,
    #[serde(default, rename = "type")]
    pub ty: Option<QualType>,
    /// `struct`, `class` or `union` for record declarations.
    #[serde(default, rename = "tagUsed")]
    pub tag_used: Option<String>,
    #[serde(default, rename = "completeDefinition")]
    pub complete_definition: bool,
    /// Semantic owner when it differs from the lexical one.
    #[serde(default, rename = "parentDeclContextId")]
    pub parent_decl_context_id: Option<Id>,
}

#[derive(Deserialize, Debug)]
pub struct ExprData {
    #[serde(default)]
    pub loc: Option<SourceLocation>,
    #[serde(default)]
    pub range: Option<SourceRange>,
    #[serde(default, rename = "type")]
    pub ty: Option<QualType>,
}

#[derive(Deserialize, Debug)]
pub struct RefExprData {
    #[serde(default)]
    pub loc: Option<SourceLocation>,
    #[serde(default)]
    pub range: Option<SourceRange>,
    #[serde(default, rename = "type")]
    pub ty: Option<QualType>,
    /// Member name, `MemberExpr` only.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "referencedDecl")]
    pub referenced_decl: Option<ReferencedDecl>,
    #[serde(default, rename = "isImplicit")]
    pub is_implicit: bool,
}

#[derive(Deserialize, Debug)]
pub struct ReferencedDecl {
    pub id: Id,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct QualType {
    #[serde(rename = "qualType")]
    pub qual_type: String,
}

/// Location that identifies where a token appears to the user: the macro
/// expansion site if there is one, the spelling otherwise.
pub fn resolve_loc(loc: &SourceLocation) -> Option<&BareSourceLocation> {
    loc.expansion_loc.as_ref().or(loc.spelling_loc.as_ref())
}

impl Clang {
    pub fn locations(&self) -> (Option<&SourceLocation>, Option<&SourceRange>) {
        match self {
            Clang::FunctionDecl(d)
            | Clang::CXXMethodDecl(d)
            | Clang::CXXConstructorDecl(d)
            | Clang::CXXDestructorDecl(d)
            | Clang::RecordDecl(d)
            | Clang::CXXRecordDecl(d)
            | Clang::VarDecl(d)
            | Clang::FieldDecl(d)
            | Clang::ParmVarDecl(d)
            | Clang::TypedefDecl(d)
            | Clang::TypeAliasDecl(d)
            | Clang::EnumDecl(d)
            | Clang::EnumConstantDecl(d)
            | Clang::NamespaceDecl(d)
            | Clang::FunctionTemplateDecl(d)
            | Clang::ClassTemplateDecl(d) => (d.loc.as_ref(), d.range.as_ref()),
            Clang::CompoundStmt(e) | Clang::CallExpr(e) | Clang::CXXMemberCallExpr(e) => {
                (e.loc.as_ref(), e.range.as_ref())
            }
            Clang::DeclRefExpr(r) | Clang::MemberExpr(r) => (r.loc.as_ref(), r.range.as_ref()),
            Clang::Other { loc, range, .. } => (loc.as_ref(), range.as_ref()),
        }
    }

    /// Written type of an expression or declaration, if clang reports one.
    pub fn type_name(&self) -> Option<&str> {
        let ty = match self {
            Clang::CompoundStmt(e) | Clang::CallExpr(e) | Clang::CXXMemberCallExpr(e) => &e.ty,
            Clang::DeclRefExpr(r) | Clang::MemberExpr(r) => &r.ty,
            Clang::Other { ty, .. } => ty,
            Clang::VarDecl(d) | Clang::FieldDecl(d) | Clang::ParmVarDecl(d) => &d.ty,
            _ => return None,
        };
        ty.as_ref().map(|t| t.qual_type.as_str())
    }

    /// clang's node kind name, e.g. `IfStmt`.
    pub fn kind_name(&self) -> String {
        match self {
            Clang::FunctionDecl(_) => "FunctionDecl".into(),
            Clang::CXXMethodDecl(_) => "CXXMethodDecl".into(),
            Clang::CXXConstructorDecl(_) => "CXXConstructorDecl".into(),
            Clang::CXXDestructorDecl(_) => "CXXDestructorDecl".into(),
            Clang::RecordDecl(_) => "RecordDecl".into(),
            Clang::CXXRecordDecl(_) => "CXXRecordDecl".into(),
            Clang::VarDecl(_) => "VarDecl".into(),
            Clang::FieldDecl(_) => "FieldDecl".into(),
            Clang::ParmVarDecl(_) => "ParmVarDecl".into(),
            Clang::TypedefDecl(_) => "TypedefDecl".into(),
            Clang::TypeAliasDecl(_) => "TypeAliasDecl".into(),
            Clang::EnumDecl(_) => "EnumDecl".into(),
            Clang::EnumConstantDecl(_) => "EnumConstantDecl".into(),
            Clang::NamespaceDecl(_) => "NamespaceDecl".into(),
            Clang::FunctionTemplateDecl(_) => "FunctionTemplateDecl".into(),
            Clang::ClassTemplateDecl(_) => "ClassTemplateDecl".into(),
            Clang::CompoundStmt(_) => "CompoundStmt".into(),
            Clang::CallExpr(_) => "CallExpr".into(),
            Clang::CXXMemberCallExpr(_) => "CXXMemberCallExpr".into(),
            Clang::DeclRefExpr(_) => "DeclRefExpr".into(),
            Clang::MemberExpr(_) => "MemberExpr".into(),
            Clang::Other { kind, .. } => format!("{kind:?}"),
        }
    }
}
