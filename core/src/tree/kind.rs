//! The closed set of node kinds and their arities.
//!
//! The discriminant of a [`NodeKind`] is its wire tag in the byte layout
//! (see [`crate::tree::encoding`]), so the declaration order below is part
//! of the storage format and must only ever be appended to.

/// How many children a node of a given kind has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Always exactly this many children.
    Fixed(u8),
    /// Child count stored in the node's payload.
    NAry,
    /// `rows * cols` children, stored in the node's payload.
    Matrix,
}

macro_rules! node_kinds {
    ($($name:ident = $arity:expr),* $(,)?) => {
        /// Type tag of a node.
        #[repr(u8)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum NodeKind {
            $($name),*
        }

        impl NodeKind {
            /// Every kind, indexed by its tag.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$name),*];

            pub const fn arity(self) -> Arity {
                match self {
                    $(NodeKind::$name => $arity),*
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$name => stringify!($name)),*
                }
            }
        }
    };
}

const LEAF: Arity = Arity::Fixed(0);
const UNARY: Arity = Arity::Fixed(1);
const BINARY: Arity = Arity::Fixed(2);
const TERNARY: Arity = Arity::Fixed(3);

node_kinds! {
    // Numbers
    Zero = LEAF,
    One = LEAF,
    Two = LEAF,
    MinusOne = LEAF,
    Half = LEAF,
    IntegerLiteral = LEAF,
    Rational = LEAF,
    Float = LEAF,
    Decimal = UNARY,
    Pi = LEAF,
    EulerE = LEAF,
    ImaginaryUnit = LEAF,
    Infinity = LEAF,
    // Markers
    Undefined = LEAF,
    NonReal = LEAF,
    Forbidden = LEAF,
    True = LEAF,
    False = LEAF,
    // Names
    UserSymbol = LEAF,
    UserFunction = UNARY,
    UserSequence = UNARY,
    Variable = LEAF,
    Parameter = LEAF,
    // Arithmetic
    Add = Arity::NAry,
    Mult = Arity::NAry,
    Sub = BINARY,
    Div = BINARY,
    Opposite = UNARY,
    Pow = BINARY,
    PowReal = BINARY,
    PowMatrix = BINARY,
    Sqrt = UNARY,
    Root = BINARY,
    Exp = UNARY,
    Ln = UNARY,
    LnReal = UNARY,
    Log = UNARY,
    LogBase = BINARY,
    Abs = UNARY,
    Floor = UNARY,
    Ceil = UNARY,
    Frac = UNARY,
    Round = BINARY,
    Sign = UNARY,
    Re = UNARY,
    Im = UNARY,
    Arg = UNARY,
    Conj = UNARY,
    Fact = UNARY,
    Binomial = BINARY,
    Permute = BINARY,
    Quo = BINARY,
    Rem = BINARY,
    Gcd = Arity::NAry,
    Lcm = Arity::NAry,
    Percent = UNARY,
    PercentAddition = BINARY,
    MixedFraction = BINARY,
    // Trigonometry
    Cos = UNARY,
    Sin = UNARY,
    Tan = UNARY,
    Sec = UNARY,
    Csc = UNARY,
    Cot = UNARY,
    ACos = UNARY,
    ASin = UNARY,
    ATan = UNARY,
    ASec = UNARY,
    ACsc = UNARY,
    ACot = UNARY,
    CosH = UNARY,
    SinH = UNARY,
    TanH = UNARY,
    ArCosH = UNARY,
    ArSinH = UNARY,
    ArTanH = UNARY,
    Trig = BINARY,
    ATrig = BINARY,
    TanRad = UNARY,
    ATanRad = UNARY,
    // Units
    Unit = LEAF,
    UnitConversion = BINARY,
    // Lists, points and matrices
    List = Arity::NAry,
    ListSequence = BINARY,
    ListElement = BINARY,
    ListSlice = TERNARY,
    ListSum = UNARY,
    ListProduct = UNARY,
    Min = UNARY,
    Max = UNARY,
    Mean = UNARY,
    Median = UNARY,
    Variance = UNARY,
    StdDev = UNARY,
    SampleStdDev = UNARY,
    ListSort = UNARY,
    Point = BINARY,
    Matrix = Arity::Matrix,
    Identity = UNARY,
    Det = UNARY,
    Trace = UNARY,
    Inverse = UNARY,
    Transpose = UNARY,
    Dim = UNARY,
    Norm = UNARY,
    Dot = BINARY,
    Cross = BINARY,
    Ref = UNARY,
    Rref = UNARY,
    // Parametric
    Sum = TERNARY,
    Product = TERNARY,
    Integral = TERNARY,
    // Logic
    Equal = BINARY,
    NotEqual = BINARY,
    Less = BINARY,
    LessOrEqual = BINARY,
    Greater = BINARY,
    GreaterOrEqual = BINARY,
    LogicalAnd = BINARY,
    LogicalOr = BINARY,
    LogicalXor = BINARY,
    LogicalNot = UNARY,
    LogicalNand = BINARY,
    LogicalNor = BINARY,
    Piecewise = Arity::NAry,
    // Random
    Random = LEAF,
    RandInt = BINARY,
    RandIntNoRep = TERNARY,
    // Dependencies
    Dependency = BINARY,
    DependencyList = Arity::NAry,
    // Syntax
    Parenthesis = UNARY,
}

static_assertions::const_assert!(NodeKind::ALL.len() <= u8::MAX as usize);

impl NodeKind {
    /// Kind for a wire tag, if any.
    pub fn from_tag(tag: u8) -> Option<NodeKind> {
        NodeKind::ALL.get(tag as usize).copied()
    }

    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub const fn is_nary(self) -> bool {
        matches!(self.arity(), Arity::NAry)
    }

    pub fn is_number(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Zero | One | Two | MinusOne | Half | IntegerLiteral | Rational | Float
        )
    }

    /// Exact rationals, the ones systematic reduction can fold.
    pub fn is_rational(self) -> bool {
        use NodeKind::*;
        matches!(self, Zero | One | Two | MinusOne | Half | IntegerLiteral | Rational)
    }

    pub fn is_boolean_literal(self) -> bool {
        matches!(self, NodeKind::True | NodeKind::False)
    }

    pub fn is_user_named(self) -> bool {
        matches!(
            self,
            NodeKind::UserSymbol | NodeKind::UserFunction | NodeKind::UserSequence
        )
    }

    pub fn is_comparison(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            Equal | NotEqual | Less | LessOrEqual | Greater | GreaterOrEqual
        )
    }

    pub fn is_logical_operator(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            LogicalAnd | LogicalOr | LogicalXor | LogicalNot | LogicalNand | LogicalNor
        )
    }

    pub fn is_random(self) -> bool {
        matches!(
            self,
            NodeKind::Random | NodeKind::RandInt | NodeKind::RandIntNoRep
        )
    }

    /// Parametric kinds bind `Variable(0)` in their last child.
    pub fn is_parametric(self) -> bool {
        matches!(
            self,
            NodeKind::Sum | NodeKind::Product | NodeKind::Integral | NodeKind::ListSequence
        )
    }

    /// Index of the child a parametric kind evaluates with its variable bound.
    pub fn parametric_body_index(self) -> Option<usize> {
        match self {
            NodeKind::Sum | NodeKind::Product | NodeKind::Integral => Some(2),
            NodeKind::ListSequence => Some(0),
            _ => None,
        }
    }

    pub fn is_direct_trigonometry(self) -> bool {
        use NodeKind::*;
        matches!(self, Cos | Sin | Tan | Sec | Csc | Cot)
    }

    pub fn is_inverse_trigonometry(self) -> bool {
        use NodeKind::*;
        matches!(self, ACos | ASin | ATan | ASec | ACsc | ACot)
    }

    pub fn is_list_statistic(self) -> bool {
        use NodeKind::*;
        matches!(
            self,
            ListSum
                | ListProduct
                | Min
                | Max
                | Mean
                | Median
                | Variance
                | StdDev
                | SampleStdDev
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tags_are_dense() {
        for (index, kind) in NodeKind::ALL.iter().enumerate() {
            assert_eq!(kind.tag() as usize, index);
            assert_eq!(NodeKind::from_tag(index as u8), Some(*kind));
        }
        assert_eq!(NodeKind::from_tag(NodeKind::ALL.len() as u8), None);
    }

    #[test]
    fn test_arities() {
        assert_eq!(NodeKind::Add.arity(), Arity::NAry);
        assert_eq!(NodeKind::Matrix.arity(), Arity::Matrix);
        assert_eq!(NodeKind::Sum.arity(), Arity::Fixed(3));
        assert_eq!(NodeKind::Pi.arity(), Arity::Fixed(0));
        assert_eq!(NodeKind::Decimal.arity(), Arity::Fixed(1));
    }

    #[test]
    fn test_parametric_body() {
        assert_eq!(NodeKind::Sum.parametric_body_index(), Some(2));
        assert_eq!(NodeKind::ListSequence.parametric_body_index(), Some(0));
        assert_eq!(NodeKind::Add.parametric_body_index(), None);
    }
}
