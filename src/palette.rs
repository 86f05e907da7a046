pub const EGA_COLOR_COUNT: usize = 16;

const EGA_COLORS: [ [ u8; 3 ]; EGA_COLOR_COUNT ] = [
    [ 0x00, 0x00, 0x00 ],
    [ 0x00, 0x00, 0xaa ],
    [ 0x00, 0xaa, 0x00 ],
    [ 0x00, 0xaa, 0xaa ],
    [ 0xaa, 0x00, 0x00 ],
    [ 0xaa, 0x00, 0xaa ],
    [ 0xaa, 0x55, 0x00 ],
    [ 0xaa, 0xaa, 0xaa ],
    [ 0x55, 0x55, 0x55 ],
    [ 0x55, 0x55, 0xff ],
    [ 0x55, 0xff, 0x55 ],
    [ 0x55, 0xff, 0xff ],
    [ 0xff, 0x55, 0x55 ],
    [ 0xff, 0x55, 0xff ],
    [ 0xff, 0xff, 0x55 ],
    [ 0xff, 0xff, 0xff ],
];

fn set_palette_rgb(palette: &mut [u8], index: usize, rgb: &[ u8; 3 ]) {
    let index = index * 3;
    palette[index..index + 3].copy_from_slice(rgb);
}

pub fn ega_palette() -> [ u8; EGA_COLOR_COUNT * 3 ] {
    let mut palette = [ 0u8; EGA_COLOR_COUNT * 3 ];
    for (n, rgb) in EGA_COLORS.iter().enumerate() {
        set_palette_rgb(&mut palette, n, rgb);
    }
    palette
}
