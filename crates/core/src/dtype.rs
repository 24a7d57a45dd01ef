//! 要素型
//!
//! デバイスベクトルの要素型（`DType`）、スカラーリテラル（`Number`）、
//! ホスト側の型との対応（`Scalar`トレイト）を定義します。

use std::fmt;

/// デバイス上の要素型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl DType {
    /// 1要素あたりのバイト数
    pub fn size_in_bytes(&self) -> usize {
        match self {
            DType::I32 | DType::U32 | DType::F32 => 4,
            DType::I64 | DType::U64 | DType::F64 => 8,
        }
    }

    /// OpenCL Cでの型名
    pub fn c_name(&self) -> &'static str {
        match self {
            DType::I32 => "int",
            DType::U32 => "uint",
            DType::I64 => "long",
            DType::U64 => "ulong",
            DType::F32 => "float",
            DType::F64 => "double",
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, DType::F32 | DType::F64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, DType::I32 | DType::I64 | DType::F32 | DType::F64)
    }

    /// 二項演算の結果型
    ///
    /// 浮動小数点が整数に勝ち、幅の広い型が狭い型に勝つ。
    /// 順序は `F64 > F32 > U64 > I64 > U32 > I32`。
    pub fn promote(self, other: DType) -> DType {
        self.max(other)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.c_name())
    }
}

/// 型付きスカラー値
///
/// 式中のリテラルとして使われます。値そのものはカーネル引数として渡されるため、
/// カーネルシグネチャには型だけが現れます。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
}

macro_rules! impl_number_dtype {
    ($($variant:ident),*) => {
        impl Number {
            pub fn dtype(&self) -> DType {
                match self {
                    $(
                        Number::$variant(_) => DType::$variant,
                    )*
                }
            }
        }
    };
}

impl_number_dtype!(I32, U32, I64, U64, F32, F64);

impl Number {
    /// 値をf64として取得
    pub fn as_f64(&self) -> f64 {
        match *self {
            Number::I32(v) => v as f64,
            Number::U32(v) => v as f64,
            Number::I64(v) => v as f64,
            Number::U64(v) => v as f64,
            Number::F32(v) => v as f64,
            Number::F64(v) => v,
        }
    }

    /// 値をi64として取得（浮動小数点は0方向に丸める）
    pub fn as_i64(&self) -> i64 {
        match *self {
            Number::I32(v) => v as i64,
            Number::U32(v) => v as i64,
            Number::I64(v) => v,
            Number::U64(v) => v as i64,
            Number::F32(v) => v as i64,
            Number::F64(v) => v as i64,
        }
    }

    /// 値をu64として取得（C言語の変換と同じく負数は折り返す）
    pub fn as_u64(&self) -> u64 {
        match *self {
            Number::I32(v) => v as u64,
            Number::U32(v) => v as u64,
            Number::I64(v) => v as u64,
            Number::U64(v) => v,
            Number::F32(v) => v as u64,
            Number::F64(v) => v as u64,
        }
    }

    /// 指定した型へ変換
    pub fn cast(self, dtype: DType) -> Number {
        if self.dtype() == dtype {
            return self;
        }
        match dtype {
            DType::I32 => Number::I32(self.as_i64() as i32),
            DType::U32 => Number::U32(self.as_u64() as u32),
            DType::I64 => Number::I64(self.as_i64()),
            DType::U64 => Number::U64(self.as_u64()),
            DType::F32 => Number::F32(self.as_f64() as f32),
            DType::F64 => Number::F64(self.as_f64()),
        }
    }

    /// ネイティブエンディアンのバイト列
    pub fn to_ne_bytes(&self) -> Vec<u8> {
        match *self {
            Number::I32(v) => v.to_ne_bytes().to_vec(),
            Number::U32(v) => v.to_ne_bytes().to_vec(),
            Number::I64(v) => v.to_ne_bytes().to_vec(),
            Number::U64(v) => v.to_ne_bytes().to_vec(),
            Number::F32(v) => v.to_ne_bytes().to_vec(),
            Number::F64(v) => v.to_ne_bytes().to_vec(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Number::I32(n) => write!(f, "{n}"),
            Number::U32(n) => write!(f, "{n}u"),
            Number::I64(n) => write!(f, "{n}l"),
            Number::U64(n) => write!(f, "{n}ul"),
            Number::F32(n) => write!(f, "{n}f"),
            Number::F64(n) => write!(f, "{n}"),
        }
    }
}

/// デバイスベクトルの要素として使えるホスト型
pub trait Scalar: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// 対応するデバイス型
    const DTYPE: DType;

    fn to_number(self) -> Number;

    /// `Number`から変換（型が異なる場合はCのキャストと同じ規則で変換）
    fn from_number(n: Number) -> Self;

    /// ネイティブエンディアンのバイト列へ変換
    fn to_bytes(data: &[Self]) -> Vec<u8>;

    /// バイト列から変換（末尾の端数は無視）
    fn from_bytes(bytes: &[u8]) -> Vec<Self>;
}

macro_rules! impl_scalar {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = DType::$variant;

                fn to_number(self) -> Number {
                    Number::$variant(self)
                }

                fn from_number(n: Number) -> Self {
                    match n.cast(DType::$variant) {
                        Number::$variant(v) => v,
                        _ => unreachable!("cast returns the requested dtype"),
                    }
                }

                fn to_bytes(data: &[Self]) -> Vec<u8> {
                    data.iter().flat_map(|v| v.to_ne_bytes()).collect()
                }

                fn from_bytes(bytes: &[u8]) -> Vec<Self> {
                    bytes
                        .chunks_exact(std::mem::size_of::<$ty>())
                        .map(|chunk| {
                            let mut raw = [0u8; std::mem::size_of::<$ty>()];
                            raw.copy_from_slice(chunk);
                            <$ty>::from_ne_bytes(raw)
                        })
                        .collect()
                }
            }

            impl From<$ty> for Number {
                fn from(v: $ty) -> Self {
                    Number::$variant(v)
                }
            }
        )*
    };
}

impl_scalar!(
    i32 => I32,
    u32 => U32,
    i64 => I64,
    u64 => U64,
    f32 => F32,
    f64 => F64,
);
