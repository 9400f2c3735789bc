use crate::error::FaceFindError;

/// Borrowed grayscale samples (0–255), row-major, `width × height`.
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> PixelBuffer<'a> {
    /// Wrap `data` as a `width × height` buffer.
    ///
    /// Rejects zero-area buffers and buffers whose length does not match
    /// the given dimensions.
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self, FaceFindError> {
        if width == 0 || height == 0 {
            return Err(FaceFindError::ZeroDimensions);
        }
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(FaceFindError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw samples.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

/// Summed-area tables of a [`PixelBuffer`]: linear sums and squared sums.
///
/// Both tables are `(width + 1) × (height + 1)` with a zero first row and
/// zero first column, so cell `(x, y)` holds the sum over all pixels with
/// column `< x` and row `< y`.
#[derive(Debug, Clone)]
pub struct IntegralImage {
    width: u32,
    height: u32,
    sums: Vec<u64>,
    squares: Vec<u64>,
}

impl IntegralImage {
    /// Build both tables in a single row-major pass.
    pub fn new(buffer: &PixelBuffer<'_>) -> Self {
        let (w, h) = (buffer.width as usize, buffer.height as usize);
        let stride = w + 1;
        let mut sums = vec![0u64; stride * (h + 1)];
        let mut squares = vec![0u64; stride * (h + 1)];

        for y in 1..=h {
            let row = &buffer.data[(y - 1) * w..y * w];
            for x in 1..=w {
                let raw = u64::from(row[x - 1]);
                let idx = y * stride + x;
                let (left, up, diag) = (idx - 1, idx - stride, idx - stride - 1);
                sums[idx] = raw + sums[left] + sums[up] - sums[diag];
                squares[idx] = raw * raw + squares[left] + squares[up] - squares[diag];
            }
        }

        Self {
            width: buffer.width,
            height: buffer.height,
            sums,
            squares,
        }
    }

    /// Width of the source buffer.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height of the source buffer.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row length of both tables (`width + 1`).
    pub fn stride(&self) -> usize {
        self.width as usize + 1
    }

    /// The padded linear-sum table.
    pub fn sum_table(&self) -> &[u64] {
        &self.sums
    }

    /// The padded squared-sum table.
    pub fn square_table(&self) -> &[u64] {
        &self.squares
    }

    /// Sum of intensities over the `w × h` rectangle whose top-left pixel is `(x, y)`.
    ///
    /// Panics if the rectangle extends past the buffer.
    pub fn rect_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        self.lookup(&self.sums, x, y, w, h)
    }

    /// Sum of squared intensities over the same rectangle convention as [`Self::rect_sum`].
    pub fn rect_square_sum(&self, x: usize, y: usize, w: usize, h: usize) -> u64 {
        self.lookup(&self.squares, x, y, w, h)
    }

    fn lookup(&self, table: &[u64], x: usize, y: usize, w: usize, h: usize) -> u64 {
        let stride = self.stride();
        let top = y * stride;
        let bottom = (y + h) * stride;
        table[bottom + x + w] + table[top + x] - table[bottom + x] - table[top + x + w]
    }
}
