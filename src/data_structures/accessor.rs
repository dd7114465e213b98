//! Raw buffers, buffer views and typed accessors.
//!
//! The numeric component type codes and the element type strings follow the
//! glTF encoding exactly, so assets produced by existing tools map 1:1.

use std::{fmt, str::FromStr, sync::Arc};

use crate::{
    data_structures::asset::{AssetId, Assets},
    error::{Error, LayoutError, Result},
};

/// Scalar type of one accessor component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentType {
    Byte,
    UnsignedByte,
    Short,
    UnsignedShort,
    UnsignedInt,
    Float,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        ComponentType::Byte,
        ComponentType::UnsignedByte,
        ComponentType::Short,
        ComponentType::UnsignedShort,
        ComponentType::UnsignedInt,
        ComponentType::Float,
    ];

    pub fn code(self) -> u32 {
        match self {
            ComponentType::Byte => 5120,
            ComponentType::UnsignedByte => 5121,
            ComponentType::Short => 5122,
            ComponentType::UnsignedShort => 5123,
            ComponentType::UnsignedInt => 5125,
            ComponentType::Float => 5126,
        }
    }

    /// Size of one component in bytes.
    pub fn size(self) -> usize {
        match self {
            ComponentType::Byte | ComponentType::UnsignedByte => 1,
            ComponentType::Short | ComponentType::UnsignedShort => 2,
            ComponentType::UnsignedInt | ComponentType::Float => 4,
        }
    }

    /// Index format for draws, if this type can index vertices on the device.
    pub fn index_format(self) -> Option<wgpu::IndexFormat> {
        match self {
            ComponentType::UnsignedShort => Some(wgpu::IndexFormat::Uint16),
            ComponentType::UnsignedInt => Some(wgpu::IndexFormat::Uint32),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ComponentType {
    type Error = LayoutError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        match code {
            5120 => Ok(ComponentType::Byte),
            5121 => Ok(ComponentType::UnsignedByte),
            5122 => Ok(ComponentType::Short),
            5123 => Ok(ComponentType::UnsignedShort),
            5125 => Ok(ComponentType::UnsignedInt),
            5126 => Ok(ComponentType::Float),
            other => Err(LayoutError::ComponentType(other)),
        }
    }
}

/// Element shape of an accessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccessorType {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl AccessorType {
    pub const ALL: [AccessorType; 7] = [
        AccessorType::Scalar,
        AccessorType::Vec2,
        AccessorType::Vec3,
        AccessorType::Vec4,
        AccessorType::Mat2,
        AccessorType::Mat3,
        AccessorType::Mat4,
    ];

    /// Number of components per element.
    pub fn element_size(self) -> usize {
        match self {
            AccessorType::Scalar => 1,
            AccessorType::Vec2 => 2,
            AccessorType::Vec3 => 3,
            AccessorType::Vec4 => 4,
            AccessorType::Mat2 => 4,
            AccessorType::Mat3 => 9,
            AccessorType::Mat4 => 16,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessorType::Scalar => "SCALAR",
            AccessorType::Vec2 => "VEC2",
            AccessorType::Vec3 => "VEC3",
            AccessorType::Vec4 => "VEC4",
            AccessorType::Mat2 => "MAT2",
            AccessorType::Mat3 => "MAT3",
            AccessorType::Mat4 => "MAT4",
        }
    }
}

impl FromStr for AccessorType {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SCALAR" => Ok(AccessorType::Scalar),
            "VEC2" => Ok(AccessorType::Vec2),
            "VEC3" => Ok(AccessorType::Vec3),
            "VEC4" => Ok(AccessorType::Vec4),
            "MAT2" => Ok(AccessorType::Mat2),
            "MAT3" => Ok(AccessorType::Mat3),
            "MAT4" => Ok(AccessorType::Mat4),
            other => Err(LayoutError::AccessorType(other.to_string())),
        }
    }
}

impl fmt::Display for AccessorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intended binding of a buffer view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferTarget {
    /// `ARRAY_BUFFER`, vertex attributes.
    Vertex,
    /// `ELEMENT_ARRAY_BUFFER`, indices.
    Index,
}

impl BufferTarget {
    pub fn code(self) -> u32 {
        match self {
            BufferTarget::Vertex => 34962,
            BufferTarget::Index => 34963,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            34962 => Some(BufferTarget::Vertex),
            34963 => Some(BufferTarget::Index),
            _ => None,
        }
    }
}

/// In-memory binary data backing buffer views.
///
/// The bytes are reference counted so one loaded blob can back many buffers
/// and outlive whichever holder drops first.
#[derive(Clone, Debug, PartialEq)]
pub struct Buffer {
    pub name: Option<String>,
    pub data: Arc<[u8]>,
}

impl Buffer {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: None,
            data: data.into(),
        }
    }
}

/// A byte range of a [`Buffer`], optionally strided.
#[derive(Clone, Debug, PartialEq)]
pub struct BufferView {
    pub buffer: AssetId,
    pub byte_offset: usize,
    pub byte_length: usize,
    pub byte_stride: Option<usize>,
    pub target: Option<BufferTarget>,
}

impl BufferView {
    pub fn new(buffer: AssetId, byte_offset: usize, byte_length: usize) -> Self {
        Self {
            buffer,
            byte_offset,
            byte_length,
            byte_stride: None,
            target: None,
        }
    }

    pub fn is_vertex_buffer(&self) -> bool {
        self.target == Some(BufferTarget::Vertex)
    }

    pub fn is_index_buffer(&self) -> bool {
        self.target == Some(BufferTarget::Index)
    }
}

/// Typed interpretation of a buffer view's bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct Accessor {
    pub buffer_view: AssetId,
    /// Offset relative to the start of the buffer view.
    pub byte_offset: usize,
    pub component_type: ComponentType,
    pub count: usize,
    pub accessor_type: AccessorType,
}

impl Accessor {
    pub fn new(
        buffer_view: AssetId,
        component_type: ComponentType,
        count: usize,
        accessor_type: AccessorType,
    ) -> Self {
        Self {
            buffer_view,
            byte_offset: 0,
            component_type,
            count,
            accessor_type,
        }
    }

    /// Builds an accessor from raw interchange values, e.g. `5126` and `"VEC3"`.
    pub fn from_codes(
        buffer_view: AssetId,
        byte_offset: usize,
        component_type: u32,
        count: usize,
        accessor_type: &str,
    ) -> Result<Self> {
        Ok(Self {
            buffer_view,
            byte_offset,
            component_type: ComponentType::try_from(component_type)?,
            count,
            accessor_type: accessor_type.parse()?,
        })
    }

    pub fn element_size(&self) -> usize {
        self.accessor_type.element_size()
    }

    pub fn component_size(&self) -> usize {
        self.component_type.size()
    }

    /// Size of one tightly packed element in bytes.
    pub fn element_byte_size(&self) -> usize {
        self.element_size() * self.component_size()
    }

    /// Saturates at `usize::MAX` for malformed counts.
    pub fn byte_length(&self) -> usize {
        self.count.saturating_mul(self.element_byte_size())
    }

    /// Copies the accessor's elements out of its buffer view, tightly
    /// packed. `id` is only used to report errors.
    ///
    /// The elements have to lie inside the view, and the view inside its
    /// buffer.
    pub fn read_bytes(&self, id: AssetId, assets: &Assets) -> Result<Vec<u8>> {
        let view = assets.buffer_view(self.buffer_view)?;
        let buffer = assets.buffer(view.buffer)?;
        let data = &buffer.data[..];
        let element = self.element_byte_size();
        let stride = match view.byte_stride {
            Some(stride) if stride < element => {
                return Err(Error::InvalidStride {
                    id,
                    stride,
                    element,
                });
            }
            Some(stride) if stride > element => Some(stride),
            _ => None,
        };
        let past_view = |end| Error::OutOfBounds {
            id,
            end,
            len: view.byte_length,
        };

        // bytes covered inside the view
        let span = match (self.count, stride) {
            (0, _) => Some(0),
            (count, Some(stride)) => stride
                .checked_mul(count - 1)
                .and_then(|bytes| bytes.checked_add(element)),
            (count, None) => count.checked_mul(element),
        };
        let end = span
            .and_then(|span| self.byte_offset.checked_add(span))
            .ok_or_else(|| past_view(usize::MAX))?;
        if end > view.byte_length {
            return Err(past_view(end));
        }
        let view_end = view.byte_offset.saturating_add(view.byte_length);
        if view_end > data.len() {
            return Err(Error::OutOfBounds {
                id,
                end: view_end,
                len: data.len(),
            });
        }
        let range = &data[view.byte_offset + self.byte_offset..view.byte_offset + end];

        match stride {
            Some(stride) => {
                let mut bytes = Vec::with_capacity(self.count * element);
                for i in 0..self.count {
                    let at = i * stride;
                    bytes.extend_from_slice(&range[at..at + element]);
                }
                Ok(bytes)
            }
            None => Ok(range.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_length_law_holds_for_every_layout() {
        let element_sizes = [1, 2, 3, 4, 4, 9, 16];
        let component_sizes = [1, 1, 2, 2, 4, 4];
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(Vec::<u8>::new()));
        let view = assets.insert(BufferView::new(buffer, 0, 0));

        let mut checked = 0;
        for (ty, element_size) in AccessorType::ALL.into_iter().zip(element_sizes) {
            for (ct, component_size) in ComponentType::ALL.into_iter().zip(component_sizes) {
                let accessor = Accessor::new(view, ct, 7, ty);
                assert_eq!(
                    accessor.byte_length(),
                    7 * element_size * component_size,
                    "{} / {}",
                    ty,
                    ct.code()
                );
                checked += 1;
            }
        }
        assert_eq!(checked, 42);
    }

    #[test]
    fn codes_match_interchange_format() {
        let codes: Vec<u32> = ComponentType::ALL.iter().map(|c| c.code()).collect();
        assert_eq!(codes, vec![5120, 5121, 5122, 5123, 5125, 5126]);
        for ct in ComponentType::ALL {
            assert_eq!(ComponentType::try_from(ct.code()), Ok(ct));
        }
        for ty in AccessorType::ALL {
            assert_eq!(ty.as_str().parse::<AccessorType>(), Ok(ty));
        }
    }

    #[test]
    fn unknown_layouts_are_rejected() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(Vec::<u8>::new()));
        let view = assets.insert(BufferView::new(buffer, 0, 0));

        // 5124 (signed int) is not a valid glTF component type
        assert!(matches!(
            Accessor::from_codes(view, 0, 5124, 1, "VEC3"),
            Err(Error::UnknownLayout(LayoutError::ComponentType(5124)))
        ));
        assert!(matches!(
            Accessor::from_codes(view, 0, 5126, 1, "VEC5"),
            Err(Error::UnknownLayout(LayoutError::AccessorType(ref t))) if t == "VEC5"
        ));
        let accessor = Accessor::from_codes(view, 0, 5126, 3, "VEC3").unwrap();
        assert_eq!(accessor.byte_length(), 36);
    }

    #[test]
    fn read_bytes_honours_view_offset_and_stride() {
        let mut assets = Assets::new();
        let bytes: Vec<u8> = (0..32).collect();
        let buffer = assets.insert(Buffer::new(bytes));

        let packed = assets.insert(BufferView::new(buffer, 4, 8));
        let mut accessor = Accessor::new(packed, ComponentType::UnsignedByte, 4, AccessorType::Scalar);
        accessor.byte_offset = 2;
        let id = assets.insert(accessor.clone());
        assert_eq!(accessor.read_bytes(id, &assets).unwrap(), vec![6, 7, 8, 9]);

        let strided = assets.insert(BufferView {
            byte_stride: Some(4),
            ..BufferView::new(buffer, 0, 16)
        });
        let accessor = Accessor::new(strided, ComponentType::UnsignedByte, 3, AccessorType::Vec2);
        let id = assets.insert(accessor.clone());
        assert_eq!(
            accessor.read_bytes(id, &assets).unwrap(),
            vec![0, 1, 4, 5, 8, 9]
        );
    }

    #[test]
    fn huge_counts_fail_instead_of_overflowing() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(vec![0u8; 36]));
        let view = assets.insert(BufferView::new(buffer, 0, 36));
        let accessor = Accessor::new(view, ComponentType::Float, usize::MAX / 4, AccessorType::Vec3);
        let id = assets.insert(accessor.clone());
        assert_eq!(accessor.byte_length(), usize::MAX);
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::OutOfBounds { len: 36, .. })
        ));

        let strided = assets.insert(BufferView {
            byte_stride: Some(16),
            ..BufferView::new(buffer, 0, 36)
        });
        let accessor = Accessor::new(strided, ComponentType::Float, usize::MAX / 4, AccessorType::Vec3);
        let id = assets.insert(accessor.clone());
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::OutOfBounds { .. })
        ));
    }

    #[test]
    fn read_bytes_stays_inside_the_view() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(vec![0u8; 16]));
        let view = assets.insert(BufferView::new(buffer, 0, 4));
        let accessor = Accessor::new(view, ComponentType::UnsignedByte, 12, AccessorType::Scalar);
        let id = assets.insert(accessor.clone());
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::OutOfBounds { end: 12, len: 4, .. })
        ));

        let mut shifted = Accessor::new(view, ComponentType::UnsignedByte, 4, AccessorType::Scalar);
        shifted.byte_offset = 1;
        let id = assets.insert(shifted.clone());
        assert!(matches!(
            shifted.read_bytes(id, &assets),
            Err(Error::OutOfBounds { end: 5, len: 4, .. })
        ));
    }

    #[test]
    fn views_past_the_buffer_fail() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(vec![0u8; 8]));
        let view = assets.insert(BufferView::new(buffer, 4, 8));
        let accessor = Accessor::new(view, ComponentType::UnsignedByte, 2, AccessorType::Scalar);
        let id = assets.insert(accessor.clone());
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::OutOfBounds { end: 12, len: 8, .. })
        ));
    }

    #[test]
    fn strides_shorter_than_an_element_fail() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(vec![0u8; 64]));
        let view = assets.insert(BufferView {
            byte_stride: Some(4),
            ..BufferView::new(buffer, 0, 64)
        });
        let accessor = Accessor::new(view, ComponentType::Float, 3, AccessorType::Vec3);
        let id = assets.insert(accessor.clone());
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::InvalidStride { stride: 4, element: 12, .. })
        ));
    }

    #[test]
    fn read_bytes_past_the_buffer_fails() {
        let mut assets = Assets::new();
        let buffer = assets.insert(Buffer::new(vec![0u8; 8]));
        let view = assets.insert(BufferView::new(buffer, 0, 8));
        let accessor = Accessor::new(view, ComponentType::Float, 3, AccessorType::Vec3);
        let id = assets.insert(accessor.clone());
        assert!(matches!(
            accessor.read_bytes(id, &assets),
            Err(Error::OutOfBounds { end: 36, len: 8, .. })
        ));
    }
}
