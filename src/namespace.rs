//! Fixed registry of ODF namespaces and qualified-name resolution.
//!
//! ODF documents use a closed, well-known set of namespace prefixes. The
//! registry below is process-wide static state built at compile time; there
//! is no dynamic namespace registration. Every qualified name ("table:cell")
//! resolves against it, and every serialized document redeclares exactly the
//! prefixes it uses.

use crate::{Error, Result};
use phf::{Map, phf_map};

// ============================================================================
// NAMESPACE CONSTANTS
// ============================================================================

/// Animation namespace
pub const ANIMNS: &str = "urn:oasis:names:tc:opendocument:xmlns:animation:1.0";

/// Chart namespace
pub const CHARTNS: &str = "urn:oasis:names:tc:opendocument:xmlns:chart:1.0";

/// OpenOffice chart extensions
pub const CHARTOOONS: &str = "http://openoffice.org/2010/chart";

/// Configuration namespace
pub const CONFIGNS: &str = "urn:oasis:names:tc:opendocument:xmlns:config:1.0";

/// CSS3 text extensions
pub const CSS3TNS: &str = "http://www.w3.org/TR/css3-text/";

/// Database namespace
pub const DBNS: &str = "urn:oasis:names:tc:opendocument:xmlns:database:1.0";

/// Dublin Core namespace
pub const DCNS: &str = "http://purl.org/dc/elements/1.1/";

/// DOM events namespace
pub const DOMNS: &str = "http://www.w3.org/2001/xml-events";

/// 3D drawing namespace
pub const DR3DNS: &str = "urn:oasis:names:tc:opendocument:xmlns:dr3d:1.0";

/// Drawing namespace
pub const DRAWNS: &str = "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0";

/// OpenOffice field extensions
pub const FIELDNS: &str = "urn:openoffice:names:experimental:ooo-ms-interop:xmlns:field:1.0";

/// XSL-FO compatible namespace
pub const FONS: &str = "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0";

/// Form namespace
pub const FORMNS: &str = "urn:oasis:names:tc:opendocument:xmlns:form:1.0";

/// OOXML-ODF form interoperability
pub const FORMXNS: &str = "urn:openoffice:names:experimental:ooxml-odf-interop:xmlns:form:1.0";

/// GRDDL namespace
pub const GRDDLNS: &str = "http://www.w3.org/2003/g/data-view#";

/// KOffice extensions
pub const KOFFICENS: &str = "http://www.koffice.org/2005/";

/// LibreOffice extensions
pub const LOEXTNS: &str = "urn:org:documentfoundation:names:experimental:office:xmlns:loext:1.0";

/// Manifest namespace
pub const MANIFESTNS: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";

/// MathML namespace
pub const MATHNS: &str = "http://www.w3.org/1998/Math/MathML";

/// Metadata namespace
pub const METANS: &str = "urn:oasis:names:tc:opendocument:xmlns:meta:1.0";

/// Number/data style namespace
pub const NUMBERNS: &str = "urn:oasis:names:tc:opendocument:xmlns:datastyle:1.0";

/// Office namespace
pub const OFFICENS: &str = "urn:oasis:names:tc:opendocument:xmlns:office:1.0";

/// OpenFormula namespace (ODF 1.2)
pub const OFNS: &str = "urn:oasis:names:tc:opendocument:xmlns:of:1.2";

/// OpenOffice Calc extensions
pub const OOOCNS: &str = "http://openoffice.org/2004/calc";

/// OpenOffice general extensions
pub const OOONS: &str = "http://openoffice.org/2004/office";

/// OpenOffice Writer extensions
pub const OOOWNS: &str = "http://openoffice.org/2004/writer";

/// Presentation namespace
pub const PRESENTATIONNS: &str = "urn:oasis:names:tc:opendocument:xmlns:presentation:1.0";

/// RDFa namespace
pub const RDFANS: &str = "http://docs.oasis-open.org/opendocument/meta/rdfa#";

/// Report namespace
pub const RPTNS: &str = "http://openoffice.org/2005/report";

/// Script namespace
pub const SCRIPTNS: &str = "urn:oasis:names:tc:opendocument:xmlns:script:1.0";

/// SMIL compatible namespace
pub const SMILNS: &str = "urn:oasis:names:tc:opendocument:xmlns:smil-compatible:1.0";

/// Style namespace
pub const STYLENS: &str = "urn:oasis:names:tc:opendocument:xmlns:style:1.0";

/// SVG compatible namespace
pub const SVGNS: &str = "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0";

/// Table namespace
pub const TABLENS: &str = "urn:oasis:names:tc:opendocument:xmlns:table:1.0";

/// OpenOffice table extensions
pub const TABLEOOONS: &str = "http://openoffice.org/2009/table";

/// Text namespace
pub const TEXTNS: &str = "urn:oasis:names:tc:opendocument:xmlns:text:1.0";

/// XForms namespace
pub const XFORMSNS: &str = "http://www.w3.org/2002/xforms";

/// XHTML namespace
pub const XHTMLNS: &str = "http://www.w3.org/1999/xhtml";

/// XLink namespace
pub const XLINKNS: &str = "http://www.w3.org/1999/xlink";

/// XML namespace
pub const XMLNS: &str = "http://www.w3.org/XML/1998/namespace";

/// XML Schema namespace
pub const XSDNS: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace
pub const XSINS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Calc extensions (LibreOffice)
pub const CALCEXTNS: &str = "urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0";

/// Drawing extensions (OpenOffice)
pub const DRAWOOONS: &str = "http://openoffice.org/2010/draw";

/// Office extensions (OpenOffice)
pub const OFFICEOOONS: &str = "http://openoffice.org/2009/office";

// ============================================================================
// NAMESPACE MAPPING (compile-time perfect hash maps)
// ============================================================================

/// URI to prefix mapping (compile-time perfect hash map for zero-cost lookups)
static URI_TO_PREFIX: Map<&'static str, &'static str> = phf_map! {
    "urn:oasis:names:tc:opendocument:xmlns:animation:1.0" => "anim",
    "urn:oasis:names:tc:opendocument:xmlns:chart:1.0" => "chart",
    "http://openoffice.org/2010/chart" => "chartooo",
    "urn:oasis:names:tc:opendocument:xmlns:config:1.0" => "config",
    "http://www.w3.org/TR/css3-text/" => "css3t",
    "urn:oasis:names:tc:opendocument:xmlns:database:1.0" => "db",
    "http://purl.org/dc/elements/1.1/" => "dc",
    "http://www.w3.org/2001/xml-events" => "dom",
    "urn:oasis:names:tc:opendocument:xmlns:dr3d:1.0" => "dr3d",
    "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" => "draw",
    "urn:openoffice:names:experimental:ooo-ms-interop:xmlns:field:1.0" => "field",
    "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0" => "fo",
    "urn:oasis:names:tc:opendocument:xmlns:form:1.0" => "form",
    "urn:openoffice:names:experimental:ooxml-odf-interop:xmlns:form:1.0" => "formx",
    "http://www.w3.org/2003/g/data-view#" => "grddl",
    "http://www.koffice.org/2005/" => "koffice",
    "urn:org:documentfoundation:names:experimental:office:xmlns:loext:1.0" => "loext",
    "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" => "manifest",
    "http://www.w3.org/1998/Math/MathML" => "math",
    "urn:oasis:names:tc:opendocument:xmlns:meta:1.0" => "meta",
    "urn:oasis:names:tc:opendocument:xmlns:datastyle:1.0" => "number",
    "urn:oasis:names:tc:opendocument:xmlns:office:1.0" => "office",
    "urn:oasis:names:tc:opendocument:xmlns:of:1.2" => "of",
    "http://openoffice.org/2004/office" => "ooo",
    "http://openoffice.org/2004/writer" => "ooow",
    "http://openoffice.org/2004/calc" => "oooc",
    "urn:oasis:names:tc:opendocument:xmlns:presentation:1.0" => "presentation",
    "http://docs.oasis-open.org/opendocument/meta/rdfa#" => "rdfa",
    "http://openoffice.org/2005/report" => "rpt",
    "urn:oasis:names:tc:opendocument:xmlns:script:1.0" => "script",
    "urn:oasis:names:tc:opendocument:xmlns:smil-compatible:1.0" => "smil",
    "urn:oasis:names:tc:opendocument:xmlns:style:1.0" => "style",
    "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0" => "svg",
    "urn:oasis:names:tc:opendocument:xmlns:table:1.0" => "table",
    "http://openoffice.org/2009/table" => "tableooo",
    "urn:oasis:names:tc:opendocument:xmlns:text:1.0" => "text",
    "http://www.w3.org/2002/xforms" => "xforms",
    "http://www.w3.org/1999/xlink" => "xlink",
    "http://www.w3.org/1999/xhtml" => "xhtml",
    "http://www.w3.org/XML/1998/namespace" => "xml",
    "http://www.w3.org/2001/XMLSchema" => "xsd",
    "http://www.w3.org/2001/XMLSchema-instance" => "xsi",
    "urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0" => "calcext",
    "http://openoffice.org/2010/draw" => "drawooo",
    "http://openoffice.org/2009/office" => "officeooo",
};

/// Prefix to URI mapping (compile-time perfect hash map for zero-cost lookups)
static PREFIX_TO_URI: Map<&'static str, &'static str> = phf_map! {
    "anim" => "urn:oasis:names:tc:opendocument:xmlns:animation:1.0",
    "chart" => "urn:oasis:names:tc:opendocument:xmlns:chart:1.0",
    "chartooo" => "http://openoffice.org/2010/chart",
    "config" => "urn:oasis:names:tc:opendocument:xmlns:config:1.0",
    "css3t" => "http://www.w3.org/TR/css3-text/",
    "db" => "urn:oasis:names:tc:opendocument:xmlns:database:1.0",
    "dc" => "http://purl.org/dc/elements/1.1/",
    "dom" => "http://www.w3.org/2001/xml-events",
    "dr3d" => "urn:oasis:names:tc:opendocument:xmlns:dr3d:1.0",
    "draw" => "urn:oasis:names:tc:opendocument:xmlns:drawing:1.0",
    "field" => "urn:openoffice:names:experimental:ooo-ms-interop:xmlns:field:1.0",
    "fo" => "urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0",
    "form" => "urn:oasis:names:tc:opendocument:xmlns:form:1.0",
    "formx" => "urn:openoffice:names:experimental:ooxml-odf-interop:xmlns:form:1.0",
    "grddl" => "http://www.w3.org/2003/g/data-view#",
    "koffice" => "http://www.koffice.org/2005/",
    "loext" => "urn:org:documentfoundation:names:experimental:office:xmlns:loext:1.0",
    "manifest" => "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0",
    "math" => "http://www.w3.org/1998/Math/MathML",
    "meta" => "urn:oasis:names:tc:opendocument:xmlns:meta:1.0",
    "number" => "urn:oasis:names:tc:opendocument:xmlns:datastyle:1.0",
    "office" => "urn:oasis:names:tc:opendocument:xmlns:office:1.0",
    "of" => "urn:oasis:names:tc:opendocument:xmlns:of:1.2",
    "ooo" => "http://openoffice.org/2004/office",
    "ooow" => "http://openoffice.org/2004/writer",
    "oooc" => "http://openoffice.org/2004/calc",
    "presentation" => "urn:oasis:names:tc:opendocument:xmlns:presentation:1.0",
    "rdfa" => "http://docs.oasis-open.org/opendocument/meta/rdfa#",
    "rpt" => "http://openoffice.org/2005/report",
    "script" => "urn:oasis:names:tc:opendocument:xmlns:script:1.0",
    "smil" => "urn:oasis:names:tc:opendocument:xmlns:smil-compatible:1.0",
    "style" => "urn:oasis:names:tc:opendocument:xmlns:style:1.0",
    "svg" => "urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0",
    "table" => "urn:oasis:names:tc:opendocument:xmlns:table:1.0",
    "tableooo" => "http://openoffice.org/2009/table",
    "text" => "urn:oasis:names:tc:opendocument:xmlns:text:1.0",
    "xforms" => "http://www.w3.org/2002/xforms",
    "xlink" => "http://www.w3.org/1999/xlink",
    "xhtml" => "http://www.w3.org/1999/xhtml",
    "xml" => "http://www.w3.org/XML/1998/namespace",
    "xsd" => "http://www.w3.org/2001/XMLSchema",
    "xsi" => "http://www.w3.org/2001/XMLSchema-instance",
    "calcext" => "urn:org:documentfoundation:names:experimental:calc:xmlns:calcext:1.0",
    "drawooo" => "http://openoffice.org/2010/draw",
    "officeooo" => "http://openoffice.org/2009/office",
};

// ============================================================================
// QUALIFIED NAME RESOLUTION
// ============================================================================

/// Split a qualified name into its optional prefix and local part.
///
/// # Examples
///
/// ```
/// use longan::namespace::split;
///
/// assert_eq!(split("table:table-cell"), (Some("table"), "table-cell"));
/// assert_eq!(split("plain"), (None, "plain"));
/// ```
#[inline]
pub fn split(qname: &str) -> (Option<&str>, &str) {
    match qname.find(':') {
        Some(pos) => (Some(&qname[..pos]), &qname[pos + 1..]),
        None => (None, qname),
    }
}

/// Resolve a qualified name to its (namespace URI, local name) pair.
///
/// An unprefixed name resolves to no namespace. A prefix outside the
/// registry is `Error::UnknownPrefix`.
///
/// # Examples
///
/// ```
/// use longan::namespace::{TABLENS, resolve};
///
/// let (uri, local) = resolve("table:table-cell").unwrap();
/// assert_eq!(uri, Some(TABLENS));
/// assert_eq!(local, "table-cell");
///
/// assert!(resolve("bogus:thing").is_err());
/// ```
pub fn resolve(qname: &str) -> Result<(Option<&'static str>, &str)> {
    match split(qname) {
        (Some(prefix), local) => {
            let uri = PREFIX_TO_URI
                .get(prefix)
                .copied()
                .ok_or_else(|| Error::UnknownPrefix(prefix.to_string()))?;
            Ok((Some(uri), local))
        },
        (None, local) => Ok((None, local)),
    }
}

/// Look up the registered prefix for a namespace URI.
///
/// # Examples
///
/// ```
/// use longan::namespace::{TABLENS, unresolve};
///
/// assert_eq!(unresolve(TABLENS).unwrap(), "table");
/// assert!(unresolve("urn:no:such:namespace").is_err());
/// ```
pub fn unresolve(uri: &str) -> Result<&'static str> {
    URI_TO_PREFIX
        .get(uri)
        .copied()
        .ok_or_else(|| Error::UnknownNamespace(uri.to_string()))
}

/// Look up the URI a prefix is bound to, if any.
#[inline]
pub fn prefix_uri(prefix: &str) -> Option<&'static str> {
    PREFIX_TO_URI.get(prefix).copied()
}

/// Whether a prefix is in the fixed registry.
#[inline]
pub fn is_registered(prefix: &str) -> bool {
    PREFIX_TO_URI.contains_key(prefix)
}

/// A parsed qualified name. Equality is on (namespace URI, local name), so
/// two spellings through different registry prefixes of the same URI would
/// compare equal; in practice the registry is one-to-one.
#[derive(Debug, Clone, Copy)]
pub struct QName<'a> {
    /// Prefix part, `None` for unprefixed names
    pub prefix: Option<&'a str>,
    /// Local part
    pub local: &'a str,
}

impl<'a> QName<'a> {
    /// Parse a qualified name without registry validation.
    #[inline]
    pub fn parse(qname: &'a str) -> Self {
        let (prefix, local) = split(qname);
        Self { prefix, local }
    }

    /// The namespace URI this name's prefix is bound to.
    pub fn uri(&self) -> Result<Option<&'static str>> {
        match self.prefix {
            Some(prefix) => prefix_uri(prefix)
                .map(Some)
                .ok_or_else(|| Error::UnknownPrefix(prefix.to_string())),
            None => Ok(None),
        }
    }
}

impl PartialEq for QName<'_> {
    fn eq(&self, other: &Self) -> bool {
        if self.local != other.local {
            return false;
        }
        match (self.prefix, other.prefix) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b || prefix_uri(a) == prefix_uri(b),
            _ => false,
        }
    }
}

impl Eq for QName<'_> {}

impl std::fmt::Display for QName<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{}:{}", prefix, self.local),
            None => write!(f, "{}", self.local),
        }
    }
}
